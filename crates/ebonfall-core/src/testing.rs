//! Shared fixtures for unit tests.

use std::collections::BTreeMap;

use ebonfall_types::{
    ChronicleState, CommanderState, EngineState, Ideology, MAP_GRID_SIZE, Phase, Resources,
    Season, SettlementTier, SimulationFlags, Structure, Survivor, SurvivorState, SurvivorStatus,
    Threat, ThreatState, Tile, TileType, Vitals, WorldState,
};

pub const ANCHOR: &str = "scarred hands and a rust-stained coat";

pub fn survivor(id: &str, name: &str) -> Survivor {
    Survivor {
        survivor_id: id.to_owned(),
        name: name.to_owned(),
        role: "Scout".to_owned(),
        status: SurvivorStatus::Healthy,
        afflictions: Vec::new(),
    }
}

pub fn threat(id: &str, unaddressed_turns: u32) -> Threat {
    Threat {
        threat_id: id.to_owned(),
        threat_type: "Starvation".to_owned(),
        start_turn: 1,
        unaddressed_turns,
    }
}

/// Two healthy survivors, ten food and wood, no threats, calm flags.
pub fn sample_state() -> EngineState {
    let mut traits = BTreeMap::new();
    traits.insert("resolve".to_owned(), 1);

    EngineState {
        commander: CommanderState {
            name: "Commander".to_owned(),
            origin: "Foundry".to_owned(),
            visual_anchor: ANCHOR.to_owned(),
            traits,
            ideology: Ideology::Pragmatism,
        },
        world: WorldState {
            turn: 1,
            season: Season::Autumn,
            phase: Phase::Morning,
            settlement_tier: SettlementTier::Encampment,
            resources: Resources {
                food: 10,
                wood: 10,
                stone: 0,
                iron: 0,
            },
            vitals: Vitals {
                health: 80,
                morale: 60,
                defense: 20,
            },
            structures: vec![Structure {
                structure_id: "palisade".to_owned(),
                name: "Palisade".to_owned(),
            }],
            map_grid: vec![
                vec![
                    Tile {
                        tile_type: TileType::Forest,
                        explored: false,
                    };
                    MAP_GRID_SIZE
                ];
                MAP_GRID_SIZE
            ],
        },
        survivors: SurvivorState {
            roster: vec![survivor("s1", "Mara"), survivor("s2", "Garrick")],
            deceased: Vec::new(),
        },
        threats: ThreatState::default(),
        flags: SimulationFlags {
            friction: 10,
            resolve: 30,
        },
        chronicle: ChronicleState::default(),
    }
}

pub fn with_threat(mut state: EngineState, threat: Threat) -> EngineState {
    state.threats.active_threats.push(threat);
    state
}
