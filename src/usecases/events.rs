use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::db::{BetStore, EventStore};
use crate::error::{AppError, Result};
use crate::payout::PayoutNotifier;
use crate::types::{Bet, BetStatus, Event, Outcome, PayoutNotification};

/// The settlement engine.
///
/// Ordering contract for winning bets: the `Won` status and payout are
/// persisted BEFORE the payout service is called. A crash between the two
/// leaves the bet out of `Pending`, so a replayed finalization cannot pay it
/// twice; an operator sweep over `Won` bets can reissue the notification.
pub struct EventUseCase {
    events: Arc<dyn EventStore>,
    bets: Arc<dyn BetStore>,
    payout: Arc<dyn PayoutNotifier>,
}

impl EventUseCase {
    pub fn new(
        events: Arc<dyn EventStore>,
        bets: Arc<dyn BetStore>,
        payout: Arc<dyn PayoutNotifier>,
    ) -> Self {
        Self {
            events,
            bets,
            payout,
        }
    }

    pub async fn get_active_events(&self) -> Result<Vec<Event>> {
        self.events.find_active(Utc::now()).await
    }

    /// Finalize an event with a known result, grading every pending bet.
    ///
    /// Idempotent: a second call for the same event returns
    /// `EventAlreadyFinalized` without touching any bet. Per-bet failures are
    /// collected and returned as one composite error; the event is closed
    /// regardless so that settled bets are never re-graded.
    pub async fn finalize_event(&self, event_id: &str, result: Outcome) -> Result<()> {
        info!(event_id, result = %result, "finalizing event");

        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(AppError::EventNotFound)?;

        if !event.is_active || event.event_result.is_some() {
            debug!(event_id, "finalization skipped: event already terminal");
            return Err(AppError::EventAlreadyFinalized);
        }

        let pending = self.bets.find_pending_by_event(event_id).await?;
        info!(event_id, count = pending.len(), "grading pending bets");

        let mut errors: Vec<AppError> = Vec::new();
        let mut paid = 0usize;
        for bet in &pending {
            self.settle_bet(bet, result, &mut errors, &mut paid).await;
        }

        match self.events.update_result_and_status(event_id, result).await {
            Ok(0) => {
                // Another finalizer won the conditional update; their pass
                // settled (or will settle) the bets, so this is benign.
                debug!(event_id, "event close affected no rows");
            }
            Ok(_) => info!(event_id, "event closed"),
            Err(e) => {
                warn!(event_id, error = %e, "failed to close event after grading");
                errors.insert(0, e);
            }
        }

        if errors.is_empty() {
            info!(event_id, graded = pending.len(), paid, "event finalized");
            Ok(())
        } else {
            Err(AppError::Finalization {
                event_id: event_id.to_string(),
                errors,
            })
        }
    }

    /// Grade and commit a single bet. Errors go into `errors`; the caller's
    /// loop continues with the next bet either way.
    async fn settle_bet(
        &self,
        bet: &Bet,
        result: Outcome,
        errors: &mut Vec<AppError>,
        paid: &mut usize,
    ) {
        let won = bet.predicted_outcome == result;
        let (status, payout_amount) = if won {
            (BetStatus::Won, bet.payout_for(result))
        } else {
            (BetStatus::Lost, 0.0)
        };

        if let Err(e) = self
            .bets
            .update_status_and_payout(&bet.id, status, payout_amount)
            .await
        {
            // The bet stays Pending and is graded again on the next
            // finalization attempt; no payout is sent for it now.
            warn!(bet_id = %bet.id, error = %e, "failed to persist bet grade");
            errors.push(AppError::BetUpdateFailed {
                bet_id: bet.id.clone(),
                reason: e.to_string(),
            });
            return;
        }

        if !won {
            debug!(bet_id = %bet.id, "bet lost");
            return;
        }
        info!(bet_id = %bet.id, user_id = %bet.user_id, payout_amount, "bet won");

        let notification = PayoutNotification {
            user_id: bet.user_id.clone(),
            amount: payout_amount,
        };
        match self.payout.notify_payout(&notification).await {
            Ok(()) => {
                if let Err(e) = self.bets.update_status(&bet.id, BetStatus::Paid).await {
                    // The payout is already out; the bet remains Won and the
                    // operator sweep will reconcile it.
                    warn!(bet_id = %bet.id, error = %e, "failed to mark bet as paid");
                    errors.push(AppError::BetUpdateFailed {
                        bet_id: bet.id.clone(),
                        reason: e.to_string(),
                    });
                } else {
                    *paid += 1;
                }
            }
            Err(e) => {
                warn!(bet_id = %bet.id, error = %e, "payout notification failed");
                errors.push(AppError::PayoutNotificationFailed {
                    bet_id: bet.id.clone(),
                    reason: e.to_string(),
                });
                if let Err(e) = self.bets.update_status(&bet.id, BetStatus::Failed).await {
                    warn!(bet_id = %bet.id, error = %e, "failed to park bet in failed state");
                    errors.push(AppError::BetUpdateFailed {
                        bet_id: bet.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}
