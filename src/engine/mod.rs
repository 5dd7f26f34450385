//! The claim engine: FCFS claim, cancel, and alternatives over job slots.

pub mod alternatives;
pub mod claims;
pub mod error;

pub use alternatives::{find_alternatives, DEFAULT_WINDOW_DAYS, MAX_ALTERNATIVES};
pub use claims::{cancel_slot, claim_slot, CancelOutcome, ClaimInput, ClaimOutcome};
pub use error::EngineError;
