use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::types::{Event, Outcome};

/// Timestamp layout used by the upstream source: naive seconds, no zone.
/// Interpreted as UTC.
const UPSTREAM_TIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";

/// Wire representation of an event as served by the upstream source of
/// truth. Chance values may be missing and default to 0 on mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalEventDto {
    pub id: String,
    #[serde(rename = "eventName", default)]
    pub event_name: String,
    #[serde(rename = "homeTeam", default)]
    pub home_team: String,
    #[serde(rename = "awayTeam", default)]
    pub away_team: String,
    #[serde(rename = "homeWinChance")]
    pub home_win_chance: Option<f64>,
    #[serde(rename = "awayWinChance")]
    pub away_win_chance: Option<f64>,
    #[serde(rename = "drawChance")]
    pub draw_chance: Option<f64>,
    #[serde(rename = "eventStartDate")]
    pub event_start_date: String,
    #[serde(rename = "eventEndDate")]
    pub event_end_date: String,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(rename = "eventResult")]
    pub result: Option<String>,
}

impl ExternalEventDto {
    /// True when the upstream explicitly canceled this event. The mapper
    /// deactivates such events without a result; the syncer additionally
    /// cancels their pending bets.
    pub fn is_canceled(&self) -> bool {
        self.result.as_deref() == Some("Canceled")
    }
}

#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_active_events(&self) -> Result<Vec<ExternalEventDto>>;
}

/// REST client for the upstream event source. No retry here: a failed fetch
/// fails the whole cycle and the syncer simply retries on the next tick.
pub struct HttpEventSourceClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEventSourceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EventSource for HttpEventSourceClient {
    async fn fetch_active_events(&self) -> Result<Vec<ExternalEventDto>> {
        let url = format!("{}/api/v1/events/active", self.base_url);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(AppError::UpstreamStatus(resp.status().as_u16()));
        }

        let events: Vec<ExternalEventDto> = resp.json().await?;
        debug!(count = events.len(), "fetched events from upstream source");
        Ok(events)
    }
}

// ---------------------------------------------------------------------------
// External -> internal mapping
// ---------------------------------------------------------------------------

/// Map an upstream DTO into an internal event record.
///
/// Resolution signals, in order: an explicit result deactivates the event;
/// "Canceled" deactivates without a result; otherwise the event stays active
/// unless its end date has already passed (settled-by-time).
pub fn map_external_event(ext: &ExternalEventDto, now: DateTime<Utc>) -> Result<Event> {
    let event_start_date = parse_upstream_time(&ext.event_start_date, "eventStartDate")?;
    let event_end_date = parse_upstream_time(&ext.event_end_date, "eventEndDate")?;

    let mut event_result = None;
    let mut make_inactive = false;

    match ext.result.as_deref() {
        Some("HomeWin") => {
            event_result = Some(Outcome::HomeWin);
            make_inactive = true;
        }
        Some("AwayWin") => {
            event_result = Some(Outcome::AwayWin);
            make_inactive = true;
        }
        Some("Draw") => {
            event_result = Some(Outcome::Draw);
            make_inactive = true;
        }
        Some("Canceled") => make_inactive = true,
        Some("Pending") | Some("") | None => {}
        Some(other) => {
            return Err(AppError::Mapping(format!(
                "unknown eventResult '{other}' for event {}",
                ext.id
            )))
        }
    }

    if !make_inactive && now > event_end_date {
        make_inactive = true;
    }

    Ok(Event {
        id: ext.id.clone(),
        event_name: ext.event_name.clone(),
        home_team: ext.home_team.clone(),
        away_team: ext.away_team.clone(),
        home_win_chance: ext.home_win_chance.unwrap_or(0.0),
        away_win_chance: ext.away_win_chance.unwrap_or(0.0),
        draw_chance: ext.draw_chance.unwrap_or(0.0),
        event_start_date,
        event_end_date,
        event_result,
        event_type: ext.event_type.clone(),
        is_active: !make_inactive,
    })
}

fn parse_upstream_time(raw: &str, field: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, UPSTREAM_TIME_LAYOUT)
        .map(|naive| naive.and_utc())
        .map_err(|e| AppError::Mapping(format!("could not parse {field} '{raw}': {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
