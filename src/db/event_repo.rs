use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::models::EventRow;
use crate::db::EventStore;
use crate::error::Result;
use crate::types::{Event, Outcome};

pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const EVENT_COLUMNS: &str = "id, event_name, home_team, away_team, home_win_chance, away_win_chance, draw_chance, event_start_date, event_end_date, event_result, type, is_active";

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn find_active(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE is_active = 1 AND event_end_date > ? \
             ORDER BY event_start_date ASC"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| Event::try_from(r).map_err(Into::into))
            .collect()
    }

    async fn find_by_id(&self, event_id: &str) -> Result<Option<Event>> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"))
                .bind(event_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| Event::try_from(r).map_err(Into::into)).transpose()
    }

    async fn upsert(&self, event: &Event) -> Result<()> {
        sqlx::query(
            "INSERT INTO events (id, event_name, home_team, away_team, \
                 home_win_chance, away_win_chance, draw_chance, \
                 event_start_date, event_end_date, event_result, type, is_active) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                 event_name = excluded.event_name, \
                 home_team = excluded.home_team, \
                 away_team = excluded.away_team, \
                 home_win_chance = excluded.home_win_chance, \
                 away_win_chance = excluded.away_win_chance, \
                 draw_chance = excluded.draw_chance, \
                 event_start_date = excluded.event_start_date, \
                 event_end_date = excluded.event_end_date, \
                 event_result = excluded.event_result, \
                 type = excluded.type, \
                 is_active = excluded.is_active",
        )
        .bind(&event.id)
        .bind(&event.event_name)
        .bind(&event.home_team)
        .bind(&event.away_team)
        .bind(event.home_win_chance)
        .bind(event.away_win_chance)
        .bind(event.draw_chance)
        .bind(event.event_start_date)
        .bind(event.event_end_date)
        .bind(event.event_result.map(|o| o.as_str()))
        .bind(&event.event_type)
        .bind(event.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_result_and_status(&self, event_id: &str, result: Outcome) -> Result<u64> {
        // The WHERE is_active = 1 predicate is the finalization lock: the
        // first writer flips the flag, every later writer affects zero rows.
        let outcome = sqlx::query(
            "UPDATE events SET event_result = ?, is_active = 0 \
             WHERE id = ? AND is_active = 1",
        )
        .bind(result.as_str())
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected())
    }
}
