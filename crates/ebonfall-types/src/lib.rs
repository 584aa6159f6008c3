//! Shared type definitions for the Ebonfall turn engine.
//!
//! This crate is the single source of truth for the world snapshot that a
//! turn consumes and produces. Every type is a plain value: cloning an
//! [`EngineState`] yields a fully independent snapshot, so a candidate state
//! can never alias the committed state it was derived from.
//!
//! # Modules
//!
//! - [`enums`] -- Closed vocabularies (season, phase, tier, ideology,
//!   survivor status, terrain).
//! - [`structs`] -- Snapshot structs (commander, world, survivors, threats,
//!   flags, chronicle) and the [`EngineState`] aggregate root.
//! - [`actions`] -- The declarative [`TurnAction`] input, its ordered
//!   [`DeltaMap`] tables, and its [`TurnInput`] envelope.

pub mod actions;
pub mod enums;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use actions::{DeltaMap, TurnAction, TurnInput};
pub use enums::{Ideology, Phase, Season, SettlementTier, SurvivorStatus, TileType};
pub use structs::{
    ChronicleEntry, ChronicleState, CommanderState, DeltaEntry, EngineState, MAP_GRID_SIZE,
    Resources, SimulationFlags, Structure, Survivor, SurvivorState, Threat, ThreatState, Tile,
    Vitals, WorldState,
};
