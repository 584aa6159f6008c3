//! Snapshot structs for the Ebonfall turn engine.
//!
//! A turn never mutates these in place. The delta applier builds a new
//! [`EngineState`] from an old one plus a [`TurnAction`], and the old value
//! stays authoritative until the orchestrator commits the candidate.
//!
//! [`TurnAction`]: crate::TurnAction

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{Ideology, Phase, Season, SettlementTier, SurvivorStatus, TileType};

/// Number of rows and columns in a well-formed map grid.
pub const MAP_GRID_SIZE: usize = 5;

// ---------------------------------------------------------------------------
// Commander
// ---------------------------------------------------------------------------

/// The player-character leading the settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommanderState {
    /// Display name.
    pub name: String,
    /// Where the commander came from before the fall.
    pub origin: String,
    /// Fixed descriptive phrase that must survive every turn verbatim and
    /// appear in every narrative.
    pub visual_anchor: String,
    /// Free-form personality weights.
    #[serde(default)]
    pub traits: BTreeMap<String, i64>,
    /// Governing ideology.
    pub ideology: Ideology,
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Settlement stockpile counters.
///
/// Nothing at this layer forces the counters to stay non-negative; an action
/// that overdraws a stockpile is still representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resources {
    /// Rations on hand.
    pub food: i64,
    /// Timber on hand.
    pub wood: i64,
    /// Cut stone on hand.
    pub stone: i64,
    /// Worked iron on hand.
    pub iron: i64,
}

/// Settlement-wide vital counters, each expected to lie in `[0, 100]` once
/// a turn commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vitals {
    /// Collective physical health.
    pub health: i64,
    /// Collective will to go on.
    pub morale: i64,
    /// Readiness of walls and watch.
    pub defense: i64,
}

impl Vitals {
    /// Lower bound of every vital in a committed state.
    pub const MIN: i64 = 0;
    /// Upper bound of every vital in a committed state.
    pub const MAX: i64 = 100;

    /// Each vital paired with its display name, in declaration order.
    pub const fn named(&self) -> [(&'static str, i64); 3] {
        [
            ("Health", self.health),
            ("Morale", self.morale),
            ("Defense", self.defense),
        ]
    }
}

/// A building standing in the settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    /// Unique key within the settlement.
    pub structure_id: String,
    /// Display name.
    pub name: String,
}

/// One cell of the surrounding map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Terrain on this cell.
    pub tile_type: TileType,
    /// Whether scouts have been there.
    pub explored: bool,
}

/// Calendar, stockpiles, buildings, and terrain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    /// Current turn number.
    pub turn: u64,
    /// Current season.
    pub season: Season,
    /// Current time of day.
    pub phase: Phase,
    /// Settlement growth tier.
    pub settlement_tier: SettlementTier,
    /// Stockpile counters.
    pub resources: Resources,
    /// Vital counters.
    pub vitals: Vitals,
    /// Standing structures, unique by `structure_id`.
    #[serde(default)]
    pub structures: Vec<Structure>,
    /// Map rows; a valid grid is [`MAP_GRID_SIZE`] x [`MAP_GRID_SIZE`].
    pub map_grid: Vec<Vec<Tile>>,
}

// ---------------------------------------------------------------------------
// Survivors
// ---------------------------------------------------------------------------

/// A single member of the settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survivor {
    /// Unique key across roster and deceased.
    pub survivor_id: String,
    /// Display name.
    pub name: String,
    /// Work the survivor performs.
    pub role: String,
    /// Current condition.
    pub status: SurvivorStatus,
    /// Accumulated lasting conditions. Never shrinks across a committed turn.
    #[serde(default)]
    pub afflictions: Vec<String>,
}

/// Living and dead survivors. The two lists are disjoint by `survivor_id`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SurvivorState {
    /// Survivors still alive, in roster order.
    #[serde(default)]
    pub roster: Vec<Survivor>,
    /// Survivors who have died, in order of death.
    #[serde(default)]
    pub deceased: Vec<Survivor>,
}

// ---------------------------------------------------------------------------
// Threats
// ---------------------------------------------------------------------------

/// A danger pressing on the settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threat {
    /// Unique key among active threats.
    pub threat_id: String,
    /// Kind of danger (e.g. `"Starvation"`, `"Raiders"`).
    pub threat_type: String,
    /// Turn the threat first appeared.
    pub start_turn: u64,
    /// Consecutive turns the threat has gone unaddressed.
    pub unaddressed_turns: u32,
}

/// The set of currently active threats.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThreatState {
    /// Active threats, in the order they were declared.
    #[serde(default)]
    pub active_threats: Vec<Threat>,
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// Social pressure counters accumulated turn over turn, unclamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimulationFlags {
    /// Infighting and unrest.
    pub friction: i64,
    /// The commander's remaining resolve.
    pub resolve: i64,
}

// ---------------------------------------------------------------------------
// Chronicle
// ---------------------------------------------------------------------------

/// One line of a turn's delta ledger: a named quantity and its signed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaEntry {
    /// Quantity name (`"Food"`, `"Health"`, `"Friction"`, `"Population"`, ...).
    pub key: String,
    /// Signed change applied this turn.
    pub value: i64,
}

/// Record of one committed turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronicleEntry {
    /// Turn number of the committed state.
    pub turn: u64,
    /// Narrative prose shown to the player.
    pub narrative: String,
    /// Structured outcome log.
    pub outcome_log: String,
    /// The ledger the narrative was validated against.
    pub deltas: Vec<DeltaEntry>,
}

/// Append-only history of committed turns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChronicleState {
    /// One entry per committed turn, oldest first.
    #[serde(default)]
    pub history: Vec<ChronicleEntry>,
    /// Running net change per ledger key across all committed turns.
    #[serde(default)]
    pub resource_trends: BTreeMap<String, i64>,
}

impl ChronicleState {
    /// Append a committed turn and fold its deltas into the running trends.
    pub fn record(&mut self, entry: ChronicleEntry) {
        for delta in &entry.deltas {
            let trend = self.resource_trends.entry(delta.key.clone()).or_insert(0);
            *trend = trend.saturating_add(delta.value);
        }
        self.history.push(entry);
    }
}

// ---------------------------------------------------------------------------
// Aggregate root
// ---------------------------------------------------------------------------

/// The complete simulation snapshot; the unit of atomic commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    /// The commander.
    pub commander: CommanderState,
    /// Calendar, stockpiles, buildings, and terrain.
    pub world: WorldState,
    /// Living and dead survivors.
    pub survivors: SurvivorState,
    /// Active threats.
    #[serde(default)]
    pub threats: ThreatState,
    /// Social pressure counters.
    pub flags: SimulationFlags,
    /// Committed turn history. Fixtures usually omit it.
    #[serde(default)]
    pub chronicle: ChronicleState,
}

impl EngineState {
    /// Number of survivors still on the roster.
    pub const fn population(&self) -> usize {
        self.survivors.roster.len()
    }
}
