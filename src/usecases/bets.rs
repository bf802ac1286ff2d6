use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{BetStore, EventStore};
use crate::error::{AppError, Result};
use crate::types::{Bet, BetStatus, Outcome};

/// Validated request to place a wager. The delivery layer has already
/// checked id formats, a positive amount, and a known outcome.
#[derive(Debug, Clone)]
pub struct PlaceBetRequest {
    pub user_id: String,
    pub event_id: String,
    pub amount: f64,
    pub predicted_outcome: Outcome,
}

pub struct BetUseCase {
    bets: Arc<dyn BetStore>,
    events: Arc<dyn EventStore>,
}

impl BetUseCase {
    pub fn new(bets: Arc<dyn BetStore>, events: Arc<dyn EventStore>) -> Self {
        Self { bets, events }
    }

    /// Place a wager against a still-open event.
    ///
    /// The admission window closes at kick-off: betting is rejected once the
    /// event's start date has passed, even though the event may still be
    /// listed as active. The event's current odds are snapshotted into the
    /// bet; later odds changes never affect this bet's payout.
    pub async fn place_bet(&self, req: PlaceBetRequest) -> Result<Bet> {
        let event = self
            .events
            .find_by_id(&req.event_id)
            .await?
            .ok_or(AppError::EventNotFound)?;

        let now = Utc::now();
        if !event.is_active || now >= event.event_end_date || now >= event.event_start_date {
            warn!(
                event_id = %req.event_id,
                is_active = event.is_active,
                start = %event.event_start_date,
                end = %event.event_end_date,
                "bet rejected: admission window closed"
            );
            return Err(AppError::EventNotActive);
        }

        let bet = Bet {
            id: Uuid::new_v4().to_string(),
            user_id: req.user_id,
            event_id: req.event_id,
            amount: req.amount,
            predicted_outcome: req.predicted_outcome,
            recorded_home_win_chance: event.home_win_chance,
            recorded_away_win_chance: event.away_win_chance,
            recorded_draw_chance: event.draw_chance,
            placed_at: now,
            status: BetStatus::Pending,
            payout_amount: 0.0,
        };

        if let Err(e) = self.bets.save(&bet).await {
            warn!(bet_id = %bet.id, error = %e, "failed to save bet");
            return Err(AppError::SavingBetFailed);
        }

        info!(bet_id = %bet.id, user_id = %bet.user_id, event_id = %bet.event_id, "bet placed");
        Ok(bet)
    }

    /// Cancel every pending bet on an event. Idempotent: no pending bets is
    /// success. Per-bet failures are accumulated without aborting the loop.
    pub async fn cancel_bets_for_event(&self, event_id: &str) -> Result<()> {
        let pending = self.bets.find_pending_by_event(event_id).await?;
        if pending.is_empty() {
            return Ok(());
        }

        let mut failed = 0usize;
        for bet in &pending {
            if let Err(e) = self.bets.update_status(&bet.id, BetStatus::Canceled).await {
                warn!(bet_id = %bet.id, error = %e, "failed to cancel bet");
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(AppError::BetCancellationFailed { failed });
        }

        info!(event_id, count = pending.len(), "pending bets canceled");
        Ok(())
    }
}
