use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    HomeWin,
    AwayWin,
    Draw,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::HomeWin => "HomeWin",
            Outcome::AwayWin => "AwayWin",
            Outcome::Draw => "Draw",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HomeWin" => Ok(Outcome::HomeWin),
            "AwayWin" => Ok(Outcome::AwayWin),
            "Draw" => Ok(Outcome::Draw),
            other => Err(format!("unknown outcome '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Bet status state machine
// ---------------------------------------------------------------------------

/// Pending is the only non-terminal state. Won is an intermediate settlement
/// state: the payout has been computed and persisted but the payout service
/// has not yet confirmed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
    Paid,
    Canceled,
    Failed,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "Pending",
            BetStatus::Won => "Won",
            BetStatus::Lost => "Lost",
            BetStatus::Paid => "Paid",
            BetStatus::Canceled => "Canceled",
            BetStatus::Failed => "Failed",
        }
    }

}

impl std::fmt::Display for BetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(BetStatus::Pending),
            "Won" => Ok(BetStatus::Won),
            "Lost" => Ok(BetStatus::Lost),
            "Paid" => Ok(BetStatus::Paid),
            "Canceled" => Ok(BetStatus::Canceled),
            "Failed" => Ok(BetStatus::Failed),
            other => Err(format!("unknown bet status '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Internal event record, mirrored from the upstream source of truth.
/// `event_result` set implies `is_active == false`; once set it never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub event_name: String,
    pub home_team: String,
    pub away_team: String,
    pub home_win_chance: f64,
    pub away_win_chance: f64,
    pub draw_chance: f64,
    pub event_start_date: DateTime<Utc>,
    pub event_end_date: DateTime<Utc>,
    pub event_result: Option<Outcome>,
    pub event_type: String,
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// Bet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Bet {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub amount: f64,
    pub predicted_outcome: Outcome,
    /// Snapshot of the event's odds at placement time. Immutable afterwards;
    /// later odds updates on the event never affect settled payouts.
    pub recorded_home_win_chance: f64,
    pub recorded_away_win_chance: f64,
    pub recorded_draw_chance: f64,
    pub placed_at: DateTime<Utc>,
    pub status: BetStatus,
    pub payout_amount: f64,
}

impl Bet {
    /// The odds snapshot taken at placement, keyed by outcome.
    pub fn recorded_chance_for(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::HomeWin => self.recorded_home_win_chance,
            Outcome::AwayWin => self.recorded_away_win_chance,
            Outcome::Draw => self.recorded_draw_chance,
        }
    }

    /// Winning payout for this bet under the given result:
    /// stake times the snapshotted multiplier, rounded to cents.
    pub fn payout_for(&self, result: Outcome) -> f64 {
        round2(self.amount * self.recorded_chance_for(result))
    }
}

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Payout notification
// ---------------------------------------------------------------------------

/// Transient instruction sent to the payout service; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutNotification {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub amount: f64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bet(amount: f64, predicted: Outcome, home: f64, away: f64, draw: f64) -> Bet {
        Bet {
            id: "bet1".to_string(),
            user_id: "user1".to_string(),
            event_id: "event1".to_string(),
            amount,
            predicted_outcome: predicted,
            recorded_home_win_chance: home,
            recorded_away_win_chance: away,
            recorded_draw_chance: draw,
            placed_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            status: BetStatus::Pending,
            payout_amount: 0.0,
        }
    }

    #[test]
    fn payout_is_stake_times_snapshot_multiplier() {
        let b = bet(10.0, Outcome::HomeWin, 2.0, 3.0, 2.5);
        assert_eq!(b.payout_for(Outcome::HomeWin), 20.0);
        assert_eq!(b.payout_for(Outcome::AwayWin), 30.0);
        assert_eq!(b.payout_for(Outcome::Draw), 25.0);
    }

    #[test]
    fn payout_rounds_half_away_from_zero() {
        // 3.33 * 1.5 = 4.995 -> 5.00
        let b = bet(3.33, Outcome::Draw, 0.0, 0.0, 1.5);
        assert_eq!(b.payout_for(Outcome::Draw), 5.0);

        // Exact midpoints round away from zero in both directions.
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
    }

    #[test]
    fn round2_exact_cents_pass_through() {
        assert_eq!(round2(20.0), 20.0);
        assert_eq!(round2(0.1 + 0.2), 0.3);
    }

    #[test]
    fn outcome_round_trips_through_str() {
        for o in [Outcome::HomeWin, Outcome::AwayWin, Outcome::Draw] {
            assert_eq!(o.as_str().parse::<Outcome>().unwrap(), o);
        }
        assert!("Pending".parse::<Outcome>().is_err());
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            BetStatus::Pending,
            BetStatus::Won,
            BetStatus::Lost,
            BetStatus::Paid,
            BetStatus::Canceled,
            BetStatus::Failed,
        ] {
            assert_eq!(s.as_str().parse::<BetStatus>().unwrap(), s);
        }
    }
}
