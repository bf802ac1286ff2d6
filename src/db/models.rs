//! Database row types for the `events` and `bets` tables.
//! Used by sqlx for typed queries; converted into domain types at the
//! repository boundary so driver representations never leak upward.

use chrono::{DateTime, Utc};

use crate::types::{Bet, BetStatus, Event, Outcome};

#[derive(Debug, sqlx::FromRow)]
pub struct EventRow {
    pub id: String,
    pub event_name: String,
    pub home_team: String,
    pub away_team: String,
    pub home_win_chance: f64,
    pub away_win_chance: f64,
    pub draw_chance: f64,
    pub event_start_date: DateTime<Utc>,
    pub event_end_date: DateTime<Utc>,
    pub event_result: Option<String>,
    #[sqlx(rename = "type")]
    pub event_type: String,
    pub is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub struct BetRow {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub amount: f64,
    pub predicted_outcome: String,
    pub recorded_home_win_chance: f64,
    pub recorded_away_win_chance: f64,
    pub recorded_draw_chance: f64,
    pub placed_at: DateTime<Utc>,
    pub status: String,
    pub payout_amount: f64,
}

fn decode_err(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

impl TryFrom<EventRow> for Event {
    type Error = sqlx::Error;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let event_result = row
            .event_result
            .map(|s| s.parse::<Outcome>().map_err(decode_err))
            .transpose()?;

        Ok(Event {
            id: row.id,
            event_name: row.event_name,
            home_team: row.home_team,
            away_team: row.away_team,
            home_win_chance: row.home_win_chance,
            away_win_chance: row.away_win_chance,
            draw_chance: row.draw_chance,
            event_start_date: row.event_start_date,
            event_end_date: row.event_end_date,
            event_result,
            event_type: row.event_type,
            is_active: row.is_active,
        })
    }
}

impl TryFrom<BetRow> for Bet {
    type Error = sqlx::Error;

    fn try_from(row: BetRow) -> Result<Self, Self::Error> {
        let predicted_outcome = row.predicted_outcome.parse::<Outcome>().map_err(decode_err)?;
        let status = row.status.parse::<BetStatus>().map_err(decode_err)?;

        Ok(Bet {
            id: row.id,
            user_id: row.user_id,
            event_id: row.event_id,
            amount: row.amount,
            predicted_outcome,
            recorded_home_win_chance: row.recorded_home_win_chance,
            recorded_away_win_chance: row.recorded_away_win_chance,
            recorded_draw_chance: row.recorded_draw_chance,
            placed_at: row.placed_at,
            status,
            payout_amount: row.payout_amount,
        })
    }
}
