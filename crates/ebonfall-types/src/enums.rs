//! Enumeration types for the Ebonfall turn engine.
//!
//! Every enum serializes to its variant name (`"Autumn"`, `"Morning"`, ...),
//! which is also the spelling used by world fixtures. Unknown values are a
//! structural input error and fail at deserialization time, before a turn
//! ever reaches the orchestrator.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// The season the settlement is currently enduring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    /// Harvest season, shortening days.
    Autumn,
    /// The hardest season; food stores are tested.
    Winter,
    /// Thaw and planting.
    Spring,
    /// Long days, dry ground.
    Summer,
}

/// Time of day within a turn. A turn input may override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Dawn through midday.
    Morning,
    /// Midday through dusk.
    Afternoon,
    /// Dusk through dawn.
    Night,
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Growth tier of the settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SettlementTier {
    /// A handful of tents and a fire pit.
    Encampment,
    /// Permanent dwellings.
    Village,
    /// Walls, trades, and a market.
    Town,
    /// A fortified population centre.
    City,
}

/// The commander's governing ideology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ideology {
    /// The group comes first.
    Altruism,
    /// Whatever keeps the settlement standing.
    Pragmatism,
    /// Each survivor looks after themselves.
    Individualism,
}

/// Condition of an individual survivor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SurvivorStatus {
    /// Fit for any duty.
    Healthy,
    /// Injured but working.
    Wounded,
    /// Ill; a risk to others.
    Sick,
    /// Broken in spirit.
    Grim,
}

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// Terrain type of a single map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TileType {
    /// Collapsed pre-fall buildings; salvage.
    Ruins,
    /// Poisoned ground.
    Blight,
    /// Timber and game.
    Forest,
    /// Thin brush, poor soil.
    Scrubland,
    /// Fresh water.
    River,
    /// Stone and ore.
    Hills,
    /// Open farmland.
    Plains,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_fixture_spelling() {
        assert_eq!(serde_json::to_string(&Season::Autumn).unwrap(), "\"Autumn\"");
        assert_eq!(serde_json::to_string(&Phase::Night).unwrap(), "\"Night\"");
        assert_eq!(
            serde_json::from_str::<TileType>("\"Scrubland\"").unwrap(),
            TileType::Scrubland
        );
    }

    #[test]
    fn unknown_variant_is_rejected() {
        assert!(serde_json::from_str::<Ideology>("\"Nihilism\"").is_err());
        assert!(serde_json::from_str::<SurvivorStatus>("\"healthy\"").is_err());
    }
}
