//! Use cases: the single source of truth for event and bet state
//! transitions. Both the HTTP handlers and the syncer call through here.

pub mod bets;
pub mod events;

pub use bets::{BetUseCase, PlaceBetRequest};
pub use events::EventUseCase;
