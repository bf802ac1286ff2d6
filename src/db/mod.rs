//! Storage layer: sqlx/SQLite repositories behind the store traits.
//! The traits are the seam the use cases are tested through.

pub mod bet_repo;
pub mod event_repo;
pub mod models;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{Bet, BetStatus, Event, Outcome};

pub use bet_repo::SqliteBetStore;
pub use event_repo::SqliteEventStore;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Events with `is_active = 1` and `event_end_date > now`, ordered by
    /// start date ascending. Empty result is not an error.
    async fn find_active(&self, now: DateTime<Utc>) -> Result<Vec<Event>>;

    /// `None` when the event does not exist; errors only on storage failure.
    async fn find_by_id(&self, event_id: &str) -> Result<Option<Event>>;

    /// Insert-or-replace keyed on id. All mutable columns are overwritten
    /// from the input; there is no merge logic.
    async fn upsert(&self, event: &Event) -> Result<()>;

    /// Conditional `WHERE id = ? AND is_active = 1` update setting the result
    /// and deactivating the event. Returns the number of rows affected: zero
    /// means the event was already terminal and the caller must treat the
    /// call as benign.
    async fn update_result_and_status(&self, event_id: &str, result: Outcome) -> Result<u64>;
}

#[async_trait]
pub trait BetStore: Send + Sync {
    /// Insert; fails on duplicate id.
    async fn save(&self, bet: &Bet) -> Result<()>;

    /// All bets in `Pending` for this event. Empty result is not an error.
    async fn find_pending_by_event(&self, event_id: &str) -> Result<Vec<Bet>>;

    /// Set status and payout atomically.
    async fn update_status_and_payout(
        &self,
        bet_id: &str,
        status: BetStatus,
        payout: f64,
    ) -> Result<()>;

    /// Set status only.
    async fn update_status(&self, bet_id: &str, status: BetStatus) -> Result<()>;
}
