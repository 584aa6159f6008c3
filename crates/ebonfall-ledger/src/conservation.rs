//! Conservation rule for the delta ledger.
//!
//! A turn may not hand out a benefit without charging for it somewhere:
//! if any ledger entry is strictly positive, at least one entry must be
//! strictly negative. A zero-valued entry is neither benefit nor cost, so a
//! ledger of only zeros (or an empty ledger) is exempt.

use ebonfall_types::DeltaEntry;

use crate::LedgerAnomaly;

/// The result of a conservation check for a single turn's ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// Every benefit is paid for, or there is no benefit at all.
    Balanced,
    /// The ledger grants something and charges nothing.
    Anomaly(LedgerAnomaly),
}

impl ConservationResult {
    /// Whether the rule holds.
    pub const fn is_balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }
}

/// Verify the conservation rule over a slice of ledger entries.
pub fn verify_conservation(entries: &[DeltaEntry]) -> ConservationResult {
    let has_cost = entries.iter().any(|entry| entry.value < 0);
    if has_cost {
        return ConservationResult::Balanced;
    }

    let benefits: Vec<String> = entries
        .iter()
        .filter(|entry| entry.value > 0)
        .map(|entry| entry.key.clone())
        .collect();

    if benefits.is_empty() {
        ConservationResult::Balanced
    } else {
        ConservationResult::Anomaly(LedgerAnomaly {
            message: format!(
                "Conservation violated: benefit without cost ({}).",
                benefits.join(", ")
            ),
            benefits,
        })
    }
}
