use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::models::BetRow;
use crate::db::BetStore;
use crate::error::Result;
use crate::types::{Bet, BetStatus};

pub struct SqliteBetStore {
    pool: SqlitePool,
}

impl SqliteBetStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const BET_COLUMNS: &str = "id, user_id, event_id, amount, predicted_outcome, recorded_home_win_chance, recorded_away_win_chance, recorded_draw_chance, placed_at, status, payout_amount";

#[async_trait]
impl BetStore for SqliteBetStore {
    async fn save(&self, bet: &Bet) -> Result<()> {
        sqlx::query(
            "INSERT INTO bets (id, user_id, event_id, amount, predicted_outcome, \
                 recorded_home_win_chance, recorded_away_win_chance, recorded_draw_chance, \
                 placed_at, status, payout_amount) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&bet.id)
        .bind(&bet.user_id)
        .bind(&bet.event_id)
        .bind(bet.amount)
        .bind(bet.predicted_outcome.as_str())
        .bind(bet.recorded_home_win_chance)
        .bind(bet.recorded_away_win_chance)
        .bind(bet.recorded_draw_chance)
        .bind(bet.placed_at)
        .bind(bet.status.as_str())
        .bind(bet.payout_amount)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_pending_by_event(&self, event_id: &str) -> Result<Vec<Bet>> {
        let rows: Vec<BetRow> = sqlx::query_as(&format!(
            "SELECT {BET_COLUMNS} FROM bets WHERE event_id = ? AND status = ?"
        ))
        .bind(event_id)
        .bind(BetStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| Bet::try_from(r).map_err(Into::into))
            .collect()
    }

    async fn update_status_and_payout(
        &self,
        bet_id: &str,
        status: BetStatus,
        payout: f64,
    ) -> Result<()> {
        sqlx::query("UPDATE bets SET status = ?, payout_amount = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(payout)
            .bind(bet_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_status(&self, bet_id: &str, status: BetStatus) -> Result<()> {
        sqlx::query("UPDATE bets SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(bet_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Outcome;
    use chrono::{TimeZone, Utc};

    async fn test_store() -> SqliteBetStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        SqliteBetStore::new(pool)
    }

    fn sample_bet(id: &str, event_id: &str) -> Bet {
        Bet {
            id: id.to_string(),
            user_id: "user1".to_string(),
            event_id: event_id.to_string(),
            amount: 10.0,
            predicted_outcome: Outcome::HomeWin,
            recorded_home_win_chance: 2.0,
            recorded_away_win_chance: 3.0,
            recorded_draw_chance: 2.5,
            placed_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            status: BetStatus::Pending,
            payout_amount: 0.0,
        }
    }

    #[tokio::test]
    async fn save_then_find_pending_round_trips() {
        let store = test_store().await;
        let bet = sample_bet("b1", "e1");
        store.save(&bet).await.unwrap();

        let pending = store.find_pending_by_event("e1").await.unwrap();
        assert_eq!(pending, vec![bet]);
    }

    #[tokio::test]
    async fn save_rejects_duplicate_id() {
        let store = test_store().await;
        let bet = sample_bet("b1", "e1");
        store.save(&bet).await.unwrap();
        assert!(store.save(&bet).await.is_err());
    }

    #[tokio::test]
    async fn find_pending_excludes_settled_and_other_events() {
        let store = test_store().await;
        store.save(&sample_bet("b1", "e1")).await.unwrap();
        store.save(&sample_bet("b2", "e1")).await.unwrap();
        store.save(&sample_bet("b3", "e2")).await.unwrap();

        store
            .update_status_and_payout("b2", BetStatus::Lost, 0.0)
            .await
            .unwrap();

        let pending = store.find_pending_by_event("e1").await.unwrap();
        let ids: Vec<&str> = pending.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b1"]);
    }

    #[tokio::test]
    async fn find_pending_empty_is_ok() {
        let store = test_store().await;
        assert!(store.find_pending_by_event("e1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_status_and_payout_sets_both() {
        let store = test_store().await;
        store.save(&sample_bet("b1", "e1")).await.unwrap();

        store
            .update_status_and_payout("b1", BetStatus::Won, 20.0)
            .await
            .unwrap();

        let pending = store.find_pending_by_event("e1").await.unwrap();
        assert!(pending.is_empty());

        // Re-read through a raw query to check both columns landed.
        let row: BetRow = sqlx::query_as(&format!("SELECT {BET_COLUMNS} FROM bets WHERE id = ?"))
            .bind("b1")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(row.status, "Won");
        assert_eq!(row.payout_amount, 20.0);
    }

    #[tokio::test]
    async fn update_status_leaves_payout_untouched() {
        let store = test_store().await;
        store.save(&sample_bet("b1", "e1")).await.unwrap();
        store
            .update_status_and_payout("b1", BetStatus::Won, 20.0)
            .await
            .unwrap();

        store.update_status("b1", BetStatus::Paid).await.unwrap();

        let row: BetRow = sqlx::query_as(&format!("SELECT {BET_COLUMNS} FROM bets WHERE id = ?"))
            .bind("b1")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(row.status, "Paid");
        assert_eq!(row.payout_amount, 20.0);
    }
}
