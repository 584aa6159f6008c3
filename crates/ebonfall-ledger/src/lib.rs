//! Per-turn delta ledger for the Ebonfall turn engine.
//!
//! The ledger is the authoritative record of "what changed and why" for a
//! single turn. It is assembled from the raw [`TurnAction`], never from a
//! diff of two states, so narrative-justification checks always compare the
//! narrative against what the player declared.
//!
//! # Modules
//!
//! - [`ledger`] -- The [`DeltaLedger`] struct and its assembly from an action.
//! - [`conservation`] -- The "no benefit without cost" rule.
//!
//! # Usage
//!
//! ```
//! use ebonfall_ledger::{ConservationResult, DeltaLedger};
//! use ebonfall_types::TurnAction;
//!
//! let mut action = TurnAction::new("Scavenge");
//! action.resource_deltas.insert("Food".to_owned(), 4);
//! action.resource_deltas.insert("Wood".to_owned(), -2);
//!
//! let ledger = DeltaLedger::from_action(&action, 0);
//! assert_eq!(ledger.get("Food"), Some(4));
//! assert_eq!(ledger.verify_conservation(), ConservationResult::Balanced);
//! ```
//!
//! [`TurnAction`]: ebonfall_types::TurnAction

pub mod conservation;
pub mod ledger;

// Re-export primary types at crate root.
pub use conservation::ConservationResult;
pub use ledger::{DeltaLedger, FRICTION_KEY, POPULATION_KEY, RESOLVE_KEY};

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// A conservation violation: the ledger grants something and charges nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LedgerAnomaly {
    /// Keys whose entries are strictly positive.
    pub benefits: Vec<String>,
    /// Human-readable description of the anomaly.
    pub message: String,
}
