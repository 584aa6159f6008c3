//! Delta applier: derives a candidate state from a previous state and an action.
//!
//! Every step is a pure function taking the previous snapshot by reference
//! and returning a new value, so the candidate never shares mutable data
//! with the committed state. The steps run in a fixed order:
//!
//! 1. phase override
//! 2. resource and vital deltas
//! 3. structure removals, then additions
//! 4. affliction additions
//! 5. threat advance
//! 6. escalation casualty selection
//! 7. deaths
//! 8. friction/resolve accumulation
//!
//! The [`DeltaLedger`] is assembled alongside from the raw action.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use ebonfall_ledger::DeltaLedger;
use ebonfall_types::{
    DeltaMap, EngineState, Resources, SimulationFlags, Structure, Survivor, SurvivorState,
    ThreatState, TurnAction, TurnInput, Vitals, WorldState,
};

/// A threat whose unaddressed-turn counter exceeds this claims a casualty.
pub const ESCALATION_THRESHOLD: u32 = 2;

/// Resource delta keys the applier recognizes.
pub const RESOURCE_KEYS: [&str; 4] = ["Food", "Wood", "Stone", "Iron"];

/// Vital delta keys the applier recognizes.
pub const VITAL_KEYS: [&str; 3] = ["Health", "Morale", "Defense"];

/// Errors that stop a turn before any candidate is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeltaError {
    /// The previous state has no living survivors; the game is over.
    #[error("Settlement lost: population is zero.")]
    PopulationZero,
}

/// A candidate state awaiting narrative and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftTurn {
    /// The derived next state. Its chronicle is still the previous one.
    pub candidate: EngineState,
    /// The ledger assembled from the raw action.
    pub ledger: DeltaLedger,
    /// Survivors selected as escalation casualties, one per escalating threat.
    pub escalation_casualties: Vec<Survivor>,
}

/// Derive the candidate state and ledger for one turn.
///
/// # Errors
///
/// Returns [`DeltaError::PopulationZero`] if the previous roster is empty.
pub fn derive_candidate(
    previous: &EngineState,
    input: &TurnInput,
) -> Result<DraftTurn, DeltaError> {
    if previous.survivors.roster.is_empty() {
        return Err(DeltaError::PopulationZero);
    }

    let action = &input.action;
    let prior = &previous.world;

    let world = WorldState {
        turn: prior.turn,
        season: prior.season,
        phase: input.phase_override.unwrap_or(prior.phase),
        settlement_tier: prior.settlement_tier,
        resources: apply_resource_deltas(prior.resources, &action.resource_deltas),
        vitals: apply_vital_deltas(prior.vitals, &action.vital_deltas),
        structures: apply_structures(
            &prior.structures,
            &action.structures_removed,
            &action.structures_added,
        ),
        map_grid: prior.map_grid.clone(),
    };

    let roster = apply_afflictions(&previous.survivors.roster, &action.afflictions_added);
    let threats = advance_threats(&previous.threats, &action.threats_addressed);
    let escalation_casualties = select_escalation_casualties(&threats, &roster);
    let survivors = apply_deaths(
        roster,
        &previous.survivors.deceased,
        &action.deceased_ids,
        &escalation_casualties,
    );
    let flags = accumulate_flags(previous.flags, action);
    let ledger = DeltaLedger::from_action(action, escalation_casualties.len());

    debug!(
        turn = world.turn,
        roster = survivors.roster.len(),
        deceased = survivors.deceased.len(),
        active_threats = threats.active_threats.len(),
        "candidate state derived"
    );

    Ok(DraftTurn {
        candidate: EngineState {
            commander: previous.commander.clone(),
            world,
            survivors,
            threats,
            flags,
            chronicle: previous.chronicle.clone(),
        },
        ledger,
        escalation_casualties,
    })
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

fn delta_for(deltas: &DeltaMap, key: &str) -> i64 {
    deltas.get(key).copied().unwrap_or(0)
}

/// Add the `Food`/`Wood`/`Stone`/`Iron` deltas; other keys are ignored.
pub fn apply_resource_deltas(resources: Resources, deltas: &DeltaMap) -> Resources {
    let [food, wood, stone, iron] = RESOURCE_KEYS;
    Resources {
        food: resources.food.saturating_add(delta_for(deltas, food)),
        wood: resources.wood.saturating_add(delta_for(deltas, wood)),
        stone: resources.stone.saturating_add(delta_for(deltas, stone)),
        iron: resources.iron.saturating_add(delta_for(deltas, iron)),
    }
}

/// Add the `Health`/`Morale`/`Defense` deltas; other keys are ignored.
///
/// No clamping happens here: an out-of-range result is left for the
/// validator to reject.
pub fn apply_vital_deltas(vitals: Vitals, deltas: &DeltaMap) -> Vitals {
    let [health, morale, defense] = VITAL_KEYS;
    Vitals {
        health: vitals.health.saturating_add(delta_for(deltas, health)),
        morale: vitals.morale.saturating_add(delta_for(deltas, morale)),
        defense: vitals.defense.saturating_add(delta_for(deltas, defense)),
    }
}

/// Remove structures by id, then add new ones.
///
/// Removal always runs first, so an id that is both removed and added ends
/// up standing. An added id that is still standing after removal is skipped.
pub fn apply_structures(
    structures: &[Structure],
    removed: &[String],
    added: &[Structure],
) -> Vec<Structure> {
    let removed: BTreeSet<&str> = removed.iter().map(String::as_str).collect();
    let mut standing: Vec<Structure> = structures
        .iter()
        .filter(|structure| !removed.contains(structure.structure_id.as_str()))
        .cloned()
        .collect();

    for structure in added {
        if !standing
            .iter()
            .any(|existing| existing.structure_id == structure.structure_id)
        {
            standing.push(structure.clone());
        }
    }
    standing
}

/// Append newly declared afflictions to roster survivors.
///
/// Existing afflictions are always carried over; survivors without an
/// addition pass through unchanged.
pub fn apply_afflictions(
    roster: &[Survivor],
    additions: &BTreeMap<String, Vec<String>>,
) -> Vec<Survivor> {
    roster
        .iter()
        .map(|survivor| {
            let mut next = survivor.clone();
            if let Some(added) = additions.get(&survivor.survivor_id) {
                next.afflictions.extend(added.iter().cloned());
            }
            next
        })
        .collect()
}

/// Drop addressed threats and age every other one by a single turn.
pub fn advance_threats(threats: &ThreatState, addressed: &[String]) -> ThreatState {
    let addressed: BTreeSet<&str> = addressed.iter().map(String::as_str).collect();
    ThreatState {
        active_threats: threats
            .active_threats
            .iter()
            .filter(|threat| !addressed.contains(threat.threat_id.as_str()))
            .map(|threat| {
                let mut next = threat.clone();
                next.unaddressed_turns = next.unaddressed_turns.saturating_add(1);
                next
            })
            .collect(),
    }
}

/// Select one casualty per threat past [`ESCALATION_THRESHOLD`].
///
/// The casualty is always the first survivor in roster order, so two
/// escalating threats in the same turn both select the same survivor. An
/// empty roster produces no casualties.
pub fn select_escalation_casualties(threats: &ThreatState, roster: &[Survivor]) -> Vec<Survivor> {
    let mut casualties = Vec::new();
    for threat in &threats.active_threats {
        if threat.unaddressed_turns <= ESCALATION_THRESHOLD {
            continue;
        }
        if let Some(first) = roster.first() {
            info!(
                threat_id = %threat.threat_id,
                threat_type = %threat.threat_type,
                unaddressed_turns = threat.unaddressed_turns,
                survivor_id = %first.survivor_id,
                "threat escalated, casualty selected"
            );
            casualties.push(first.clone());
        }
    }
    casualties
}

/// Move every survivor named in `deceased_ids` or `casualties` from the
/// roster to the deceased list.
///
/// A survivor already on the deceased list is never added twice.
pub fn apply_deaths(
    roster: Vec<Survivor>,
    deceased: &[Survivor],
    deceased_ids: &[String],
    casualties: &[Survivor],
) -> SurvivorState {
    let doomed: BTreeSet<&str> = deceased_ids
        .iter()
        .map(String::as_str)
        .chain(casualties.iter().map(|s| s.survivor_id.as_str()))
        .collect();

    let mut dead = deceased.to_vec();
    let mut living = Vec::with_capacity(roster.len());

    for survivor in roster {
        if !doomed.contains(survivor.survivor_id.as_str()) {
            living.push(survivor);
        } else if !dead.iter().any(|d| d.survivor_id == survivor.survivor_id) {
            dead.push(survivor);
        }
    }

    SurvivorState {
        roster: living,
        deceased: dead,
    }
}

/// Add the action's friction and resolve deltas, unclamped.
pub const fn accumulate_flags(flags: SimulationFlags, action: &TurnAction) -> SimulationFlags {
    SimulationFlags {
        friction: flags.friction.saturating_add(action.friction_delta),
        resolve: flags.resolve.saturating_add(action.resolve_delta),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use ebonfall_types::Phase;

    use super::*;
    use crate::testing::{sample_state, survivor, threat, with_threat};

    fn action_with(resource: &[(&str, i64)]) -> TurnAction {
        let mut action = TurnAction::new("Scavenge");
        for (key, value) in resource {
            action.resource_deltas.insert((*key).to_owned(), *value);
        }
        action
    }

    #[test]
    fn empty_roster_is_refused() {
        let mut state = sample_state();
        state.survivors.deceased = std::mem::take(&mut state.survivors.roster);
        let result = derive_candidate(&state, &TurnInput::from(TurnAction::new("Pray")));
        assert_eq!(result, Err(DeltaError::PopulationZero));
    }

    #[test]
    fn resource_and_vital_deltas_are_added() {
        let mut action = action_with(&[("Food", 4), ("Wood", -2), ("Salt", 9)]);
        action.vital_deltas.insert("Health".to_owned(), -5);
        action.vital_deltas.insert("Luck".to_owned(), 50);

        let draft = derive_candidate(&sample_state(), &action.into()).unwrap();
        let world = &draft.candidate.world;
        assert_eq!(world.resources.food, 14);
        assert_eq!(world.resources.wood, 8);
        assert_eq!(world.resources.stone, 0);
        assert_eq!(world.vitals.health, 75);
        assert_eq!(world.vitals.morale, 60);
    }

    #[test]
    fn previous_state_is_untouched() {
        let previous = sample_state();
        let snapshot = previous.clone();
        let mut action = action_with(&[("Food", -3)]);
        action.deceased_ids.push("s1".to_owned());
        let _ = derive_candidate(&previous, &action.into()).unwrap();
        assert_eq!(previous, snapshot);
    }

    #[test]
    fn phase_override_replaces_phase() {
        let input = TurnInput {
            action: TurnAction::new("March by night"),
            phase_override: Some(Phase::Night),
        };
        let draft = derive_candidate(&sample_state(), &input).unwrap();
        assert_eq!(draft.candidate.world.phase, Phase::Night);
    }

    #[test]
    fn structures_removed_before_added() {
        let existing = sample_state().world.structures;
        let well = Structure {
            structure_id: "well".to_owned(),
            name: "Well".to_owned(),
        };
        let rebuilt = Structure {
            structure_id: "palisade".to_owned(),
            name: "Rebuilt Palisade".to_owned(),
        };

        let result = apply_structures(
            &existing,
            &["palisade".to_owned()],
            &[rebuilt.clone(), well.clone()],
        );
        assert_eq!(result, vec![rebuilt, well]);
    }

    #[test]
    fn duplicate_structure_id_is_not_added_twice() {
        let existing = sample_state().world.structures;
        let duplicate = Structure {
            structure_id: "palisade".to_owned(),
            name: "Second Palisade".to_owned(),
        };
        let result = apply_structures(&existing, &[], &[duplicate]);
        assert_eq!(result, existing);
    }

    #[test]
    fn afflictions_are_appended_not_replaced() {
        let mut roster = vec![survivor("s1", "Mara"), survivor("s2", "Garrick")];
        roster[0].afflictions.push("Limp".to_owned());

        let mut additions = BTreeMap::new();
        additions.insert("s1".to_owned(), vec!["Cough".to_owned()]);
        additions.insert("ghost".to_owned(), vec!["Fever".to_owned()]);

        let result = apply_afflictions(&roster, &additions);
        assert_eq!(result[0].afflictions, vec!["Limp", "Cough"]);
        assert_eq!(result[1], roster[1]);
    }

    #[test]
    fn addressed_threats_are_removed_others_age() {
        let threats = ThreatState {
            active_threats: vec![threat("t1", 0), threat("t2", 1)],
        };
        let result = advance_threats(&threats, &["t1".to_owned()]);
        assert_eq!(result.active_threats.len(), 1);
        assert_eq!(result.active_threats[0].threat_id, "t2");
        assert_eq!(result.active_threats[0].unaddressed_turns, 2);
    }

    #[test]
    fn escalation_takes_first_in_roster_order() {
        let state = with_threat(sample_state(), threat("t1", 2));
        let draft = derive_candidate(&state, &TurnAction::new("Ignore").into()).unwrap();

        assert_eq!(draft.candidate.threats.active_threats[0].unaddressed_turns, 3);
        assert_eq!(draft.escalation_casualties.len(), 1);
        assert_eq!(draft.escalation_casualties[0].survivor_id, "s1");
        assert_eq!(draft.candidate.survivors.roster.len(), 1);
        assert_eq!(draft.candidate.survivors.deceased[0].survivor_id, "s1");
        assert_eq!(draft.ledger.get("Population"), Some(-1));
    }

    #[test]
    fn threat_at_threshold_does_not_escalate() {
        let state = with_threat(sample_state(), threat("t1", 1));
        let draft = derive_candidate(&state, &TurnAction::new("Ignore").into()).unwrap();
        assert!(draft.escalation_casualties.is_empty());
        assert_eq!(draft.candidate.population(), 2);
    }

    #[test]
    fn two_escalating_threats_select_the_same_survivor() {
        let state = with_threat(with_threat(sample_state(), threat("t1", 3)), threat("t2", 5));
        let draft = derive_candidate(&state, &TurnAction::new("Ignore").into()).unwrap();

        assert_eq!(draft.escalation_casualties.len(), 2);
        assert_eq!(draft.candidate.population(), 1);
        assert_eq!(draft.candidate.survivors.deceased.len(), 1);
        assert_eq!(draft.ledger.get("Population"), Some(-2));
    }

    #[test]
    fn empty_roster_produces_no_casualty() {
        let threats = ThreatState {
            active_threats: vec![threat("t1", 9)],
        };
        assert!(select_escalation_casualties(&threats, &[]).is_empty());
    }

    #[test]
    fn deaths_are_idempotent() {
        let roster = vec![survivor("s1", "Mara"), survivor("s2", "Garrick")];
        let already_dead = vec![survivor("s1", "Mara")];
        let result = apply_deaths(
            roster,
            &already_dead,
            &["s1".to_owned(), "s1".to_owned()],
            &[survivor("s1", "Mara")],
        );
        assert_eq!(result.roster.len(), 1);
        assert_eq!(result.roster[0].survivor_id, "s2");
        assert_eq!(result.deceased.len(), 1);
    }

    #[test]
    fn explicit_deaths_move_to_deceased() {
        let mut action = action_with(&[("Food", -1)]);
        action.deceased_ids.push("s2".to_owned());
        let draft = derive_candidate(&sample_state(), &action.into()).unwrap();
        assert_eq!(draft.candidate.survivors.roster[0].survivor_id, "s1");
        assert_eq!(draft.candidate.survivors.deceased[0].survivor_id, "s2");
        assert_eq!(draft.ledger.get("Population"), Some(-1));
    }

    #[test]
    fn flags_accumulate_without_clamping() {
        let mut action = TurnAction::new("Argue");
        action.friction_delta = 45;
        action.resolve_delta = -40;
        let flags = accumulate_flags(sample_state().flags, &action);
        assert_eq!(flags.friction, 55);
        assert_eq!(flags.resolve, -10);
    }
}
