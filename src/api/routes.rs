use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::READYZ_PING_TIMEOUT_SECS;
use crate::error::AppError;
use crate::types::{Bet, BetStatus, Event, Outcome};
use crate::usecases::{BetUseCase, EventUseCase, PlaceBetRequest};

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub events: Arc<EventUseCase>,
    pub bets: Arc<BetUseCase>,
}

pub fn router(state: ApiState) -> Router {
    let v1 = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/events", get(get_active_events))
        .route("/events/:event_id/finalize", post(finalize_event))
        .route("/bets", post(place_bet))
        .with_state(state);

    Router::new().nest("/api/v1", v1)
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PlaceBetBody {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "eventId")]
    pub event_id: String,
    pub amount: f64,
    #[serde(rename = "predictedOutcome")]
    pub predicted_outcome: String,
}

#[derive(Deserialize)]
pub struct FinalizeEventBody {
    pub result: String,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: String,
    pub event_name: String,
    pub home_team: String,
    pub away_team: String,
    pub home_win_chance: f64,
    pub away_win_chance: f64,
    pub draw_chance: f64,
    pub event_start_date: DateTime<Utc>,
    pub event_end_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_result: Option<Outcome>,
    #[serde(rename = "type")]
    pub event_type: String,
}

impl From<&Event> for EventResponse {
    fn from(e: &Event) -> Self {
        Self {
            id: e.id.clone(),
            event_name: e.event_name.clone(),
            home_team: e.home_team.clone(),
            away_team: e.away_team.clone(),
            home_win_chance: e.home_win_chance,
            away_win_chance: e.away_win_chance,
            draw_chance: e.draw_chance,
            event_start_date: e.event_start_date,
            event_end_date: e.event_end_date,
            event_result: e.event_result,
            event_type: e.event_type.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetResponse {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub amount: f64,
    pub predicted_outcome: Outcome,
    pub placed_at: DateTime<Utc>,
    pub status: BetStatus,
}

impl From<&Bet> for BetResponse {
    fn from(b: &Bet) -> Self {
        Self {
            id: b.id.clone(),
            user_id: b.user_id.clone(),
            event_id: b.event_id.clone(),
            amount: b.amount,
            predicted_outcome: b.predicted_outcome,
            placed_at: b.placed_at,
            status: b.status,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn readyz(State(state): State<ApiState>) -> StatusCode {
    let ping = sqlx::query("SELECT 1").execute(&state.pool);
    match tokio::time::timeout(Duration::from_secs(READYZ_PING_TIMEOUT_SECS), ping).await {
        Ok(Ok(_)) => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn get_active_events(
    State(state): State<ApiState>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let events = state.events.get_active_events().await?;
    Ok(Json(events.iter().map(EventResponse::from).collect()))
}

async fn finalize_event(
    State(state): State<ApiState>,
    Path(event_id): Path<String>,
    Json(body): Json<FinalizeEventBody>,
) -> Result<StatusCode, AppError> {
    let result = body
        .result
        .parse::<Outcome>()
        .map_err(|_| AppError::InvalidFinalizationResult)?;

    state.events.finalize_event(&event_id, result).await?;
    Ok(StatusCode::OK)
}

async fn place_bet(
    State(state): State<ApiState>,
    Json(body): Json<PlaceBetBody>,
) -> Result<(StatusCode, Json<BetResponse>), AppError> {
    let request = validate_place_bet(body)?;
    let bet = state.bets.place_bet(request).await?;
    Ok((StatusCode::CREATED, Json(BetResponse::from(&bet))))
}

fn validate_place_bet(body: PlaceBetBody) -> Result<PlaceBetRequest, AppError> {
    if Uuid::parse_str(&body.user_id).is_err() {
        return Err(AppError::Validation("userId must be a UUID".to_string()));
    }
    if Uuid::parse_str(&body.event_id).is_err() {
        return Err(AppError::Validation("eventId must be a UUID".to_string()));
    }
    if !body.amount.is_finite() || body.amount <= 0.0 {
        return Err(AppError::Validation("amount must be greater than 0".to_string()));
    }
    let predicted_outcome = body
        .predicted_outcome
        .parse::<Outcome>()
        .map_err(|_| {
            AppError::Validation("predictedOutcome must be HomeWin, AwayWin or Draw".to_string())
        })?;

    Ok(PlaceBetRequest {
        user_id: body.user_id,
        event_id: body.event_id,
        amount: body.amount,
        predicted_outcome,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{EventStore, SqliteBetStore, SqliteEventStore};
    use crate::usecases::mocks::MockPayoutNotifier;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Duration as ChronoDuration;
    use tower::ServiceExt;

    const EVENT_ID: &str = "0d4f0f7a-2b5a-4a6e-8a8a-111111111111";
    const USER_ID: &str = "9f8e7d6c-5b4a-4c3d-9e2f-222222222222";

    struct TestApp {
        router: Router,
        event_store: Arc<SqliteEventStore>,
        payout: Arc<MockPayoutNotifier>,
    }

    async fn test_app() -> TestApp {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        let event_store = Arc::new(SqliteEventStore::new(pool.clone()));
        let bet_store = Arc::new(SqliteBetStore::new(pool.clone()));
        let payout = Arc::new(MockPayoutNotifier::default());

        let events = Arc::new(EventUseCase::new(
            event_store.clone(),
            bet_store.clone(),
            payout.clone(),
        ));
        let bets = Arc::new(BetUseCase::new(bet_store, event_store.clone()));

        let router = router(ApiState { pool, events, bets });
        TestApp {
            router,
            event_store,
            payout,
        }
    }

    fn open_event(start_offset_mins: i64) -> Event {
        let now = Utc::now();
        Event {
            id: EVENT_ID.to_string(),
            event_name: "Home vs Away".to_string(),
            home_team: "Home".to_string(),
            away_team: "Away".to_string(),
            home_win_chance: 2.0,
            away_win_chance: 3.0,
            draw_chance: 2.5,
            event_start_date: now + ChronoDuration::minutes(start_offset_mins),
            event_end_date: now + ChronoDuration::hours(2),
            event_result: None,
            event_type: "football".to_string(),
            is_active: true,
        }
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn place_bet_body() -> serde_json::Value {
        serde_json::json!({
            "userId": USER_ID,
            "eventId": EVENT_ID,
            "amount": 10.0,
            "predictedOutcome": "HomeWin",
        })
    }

    #[tokio::test]
    async fn probes_respond() {
        let app = test_app().await;

        let resp = app
            .router
            .clone()
            .oneshot(get_request("/api/v1/healthz"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .router
            .clone()
            .oneshot(get_request("/api/v1/readyz"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn place_bet_returns_created_with_pending_bet() {
        let app = test_app().await;
        app.event_store.upsert(&open_event(60)).await.unwrap();

        let resp = app
            .router
            .clone()
            .oneshot(json_request("POST", "/api/v1/bets", place_bet_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = body_json(resp).await;
        assert_eq!(body["userId"], USER_ID);
        assert_eq!(body["eventId"], EVENT_ID);
        assert_eq!(body["status"], "Pending");
        assert_eq!(body["predictedOutcome"], "HomeWin");
        assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn place_bet_rejects_malformed_ids_and_amounts() {
        let app = test_app().await;
        app.event_store.upsert(&open_event(60)).await.unwrap();

        let mut bad_user = place_bet_body();
        bad_user["userId"] = serde_json::json!("not-a-uuid");
        let resp = app
            .router
            .clone()
            .oneshot(json_request("POST", "/api/v1/bets", bad_user))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let mut bad_amount = place_bet_body();
        bad_amount["amount"] = serde_json::json!(0.0);
        let resp = app
            .router
            .clone()
            .oneshot(json_request("POST", "/api/v1/bets", bad_amount))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let mut bad_outcome = place_bet_body();
        bad_outcome["predictedOutcome"] = serde_json::json!("Tie");
        let resp = app
            .router
            .clone()
            .oneshot(json_request("POST", "/api/v1/bets", bad_outcome))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn place_bet_on_unknown_event_is_not_found() {
        let app = test_app().await;

        let resp = app
            .router
            .clone()
            .oneshot(json_request("POST", "/api/v1/bets", place_bet_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn started_event_is_listed_but_rejects_bets() {
        // Listing filters only on activity and end date; admission also
        // requires the start date to be in the future. Both sides of the
        // asymmetry are asserted.
        let app = test_app().await;
        app.event_store.upsert(&open_event(-10)).await.unwrap();

        let resp = app
            .router
            .clone()
            .oneshot(get_request("/api/v1/events"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], EVENT_ID);

        let resp = app
            .router
            .clone()
            .oneshot(json_request("POST", "/api/v1/bets", place_bet_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn event_listing_uses_wire_field_names() {
        let app = test_app().await;
        app.event_store.upsert(&open_event(60)).await.unwrap();

        let resp = app
            .router
            .clone()
            .oneshot(get_request("/api/v1/events"))
            .await
            .unwrap();
        let body = body_json(resp).await;
        let event = &body[0];
        for field in [
            "id",
            "eventName",
            "homeTeam",
            "awayTeam",
            "homeWinChance",
            "awayWinChance",
            "drawChance",
            "eventStartDate",
            "eventEndDate",
            "type",
        ] {
            assert!(event.get(field).is_some(), "missing field {field}");
        }
        // No result yet, so the field is omitted entirely.
        assert!(event.get("eventResult").is_none());
    }

    #[tokio::test]
    async fn finalize_settles_and_is_idempotent_over_http() {
        let app = test_app().await;
        app.event_store.upsert(&open_event(60)).await.unwrap();

        let resp = app
            .router
            .clone()
            .oneshot(json_request("POST", "/api/v1/bets", place_bet_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let finalize_uri = format!("/api/v1/events/{EVENT_ID}/finalize");
        let resp = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                &finalize_uri,
                serde_json::json!({"result": "HomeWin"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        // 10 x 2.0 at the snapshotted odds.
        let payouts = app.payout.recorded();
        assert_eq!(payouts.len(), 1);
        assert_eq!(payouts[0].user_id, USER_ID);
        assert_eq!(payouts[0].amount, 20.0);

        let resp = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                &finalize_uri,
                serde_json::json!({"result": "HomeWin"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(app.payout.recorded().len(), 1);
    }

    #[tokio::test]
    async fn finalize_maps_error_kinds_to_statuses() {
        let app = test_app().await;

        let resp = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/events/ghost/finalize",
                serde_json::json!({"result": "HomeWin"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/events/ghost/finalize",
                serde_json::json!({"result": "Pending"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn failed_payout_surfaces_as_internal_error_and_event_stays_finalized() {
        let app = test_app().await;
        app.event_store.upsert(&open_event(60)).await.unwrap();
        app.payout
            .fail
            .store(true, std::sync::atomic::Ordering::SeqCst);

        let resp = app
            .router
            .clone()
            .oneshot(json_request("POST", "/api/v1/bets", place_bet_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let finalize_uri = format!("/api/v1/events/{EVENT_ID}/finalize");
        let resp = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                &finalize_uri,
                serde_json::json!({"result": "HomeWin"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                &finalize_uri,
                serde_json::json!({"result": "HomeWin"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
