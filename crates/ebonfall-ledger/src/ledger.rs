//! The delta ledger: an ordered, key-merged list of signed changes.
//!
//! # Design
//!
//! - **Declared, not derived**: built from the action's raw deltas. Keys the
//!   delta applier ignores (e.g. an unknown resource name) still appear here.
//! - **Ordered**: resource keys, then vital keys (each in the order the action
//!   declared them), then `Friction`, `Resolve`, and `Population`. Recording an existing key adds to it in place.
//! - **Zero entries are kept**: they are omitted from narrative clauses but
//!   still listed in the outcome log.

use serde::{Deserialize, Serialize};
use tracing::debug;

use ebonfall_types::{DeltaEntry, TurnAction};

use crate::conservation::{ConservationResult, verify_conservation};

/// Ledger key for the friction flag delta.
pub const FRICTION_KEY: &str = "Friction";
/// Ledger key for the resolve flag delta.
pub const RESOLVE_KEY: &str = "Resolve";
/// Ledger key for the change in living survivors.
pub const POPULATION_KEY: &str = "Population";

/// The per-turn summary of named quantities and their signed change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeltaLedger {
    /// All entries, in insertion order, unique by key.
    entries: Vec<DeltaEntry>,
}

impl DeltaLedger {
    /// Create an empty ledger.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Assemble the ledger for a turn from the raw action.
    ///
    /// `escalation_casualties` is the number of casualties the delta applier
    /// selected for escalating threats; together with the action's explicit
    /// death ids it forms the negative `Population` entry.
    pub fn from_action(action: &TurnAction, escalation_casualties: usize) -> Self {
        let mut ledger = Self::new();

        for (key, value) in action.resource_deltas.pairs() {
            ledger.record(key, value);
        }
        for (key, value) in action.vital_deltas.pairs() {
            ledger.record(key, value);
        }
        if action.friction_delta != 0 {
            ledger.record(FRICTION_KEY, action.friction_delta);
        }
        if action.resolve_delta != 0 {
            ledger.record(RESOLVE_KEY, action.resolve_delta);
        }

        let deaths = action
            .deceased_ids
            .len()
            .saturating_add(escalation_casualties);
        if deaths > 0 {
            let deaths = i64::try_from(deaths).unwrap_or(i64::MAX);
            ledger.record(POPULATION_KEY, 0_i64.saturating_sub(deaths));
        }

        debug!(
            entries = ledger.len(),
            escalation_casualties = escalation_casualties,
            "delta ledger assembled"
        );
        ledger
    }

    /// Add `value` to the entry for `key`, creating it if absent.
    pub fn record(&mut self, key: &str, value: i64) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.key == key) {
            entry.value = entry.value.saturating_add(value);
        } else {
            self.entries.push(DeltaEntry {
                key: key.to_owned(),
                value,
            });
        }
    }

    /// The value recorded for `key`, if any.
    pub fn get(&self, key: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value)
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[DeltaEntry] {
        &self.entries
    }

    /// Entries whose value is not zero.
    pub fn nonzero(&self) -> impl Iterator<Item = &DeltaEntry> {
        self.entries.iter().filter(|entry| entry.value != 0)
    }

    /// Consume the ledger and return its entries.
    pub fn into_entries(self) -> Vec<DeltaEntry> {
        self.entries
    }

    /// Number of distinct keys.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the "no benefit without cost" rule for this ledger.
    pub fn verify_conservation(&self) -> ConservationResult {
        verify_conservation(&self.entries)
    }
}

impl From<Vec<DeltaEntry>> for DeltaLedger {
    fn from(raw: Vec<DeltaEntry>) -> Self {
        let mut ledger = Self::new();
        for entry in raw {
            ledger.record(&entry.key, entry.value);
        }
        ledger
    }
}
