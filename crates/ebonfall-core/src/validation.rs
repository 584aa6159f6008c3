//! Consistency validator: decides whether a candidate state may commit.
//!
//! The validator is a fixed, ordered battery of independent checks over the
//! previous state, the candidate state, the narrative, the outcome log, and
//! the delta ledger. Every check always runs; there is no early exit, so one
//! pass reports every applicable [`Violation`]. An empty report approves the
//! turn.
//!
//! Checks, in order:
//!
//! 1. map grid is 5x5
//! 2. every vital lies in `[0, 100]`
//! 3. conservation: no benefit without a cost
//! 4. diegetic integration: every nonzero ledger key is named in the prose
//! 5. no forbidden (immersion-breaking) phrases
//! 6. at least one sensory anchor word
//! 7. outcome log container and entries
//! 8. afflictions are never dropped
//! 9. roster and deceased are disjoint
//! 10. an escalated threat costs a life
//! 11. the settlement still has survivors (fatal)
//! 12. friction/resolve signals appear in the prose
//! 13. the commander's visual anchor is stable and quoted

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use ebonfall_ledger::conservation::{ConservationResult, verify_conservation};
use ebonfall_types::{DeltaEntry, EngineState, MAP_GRID_SIZE, Vitals};

use crate::delta::ESCALATION_THRESHOLD;
use crate::narrative::OUTCOME_LOG_MARKER;

/// Phrases that break immersion: internal-feeling statements and
/// supernatural vocabulary. Matched case-insensitively.
pub const FORBIDDEN_PHRASES: [&str; 5] = ["you feel", "i feel", "magic", "spell", "divine"];

/// Words anchoring the prose in the setting's physical texture.
pub const SENSORY_ANCHORS: [&str; 3] = ["mud", "rust", "cold"];

/// Friction at or above this must surface as sabotage or mutiny.
pub const FRICTION_UNREST_THRESHOLD: i64 = 40;

/// Resolve below this must surface as fragmented narration.
pub const RESOLVE_FRACTURE_THRESHOLD: i64 = 20;

const UNREST_TOKENS: [&str; 2] = ["sabotage", "mutiny"];
const FRACTURE_TOKEN: &str = "fragment";

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

/// Which rule a [`Violation`] breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ViolationKind {
    /// Map grid is not 5x5.
    MapGrid,
    /// A vital is outside `[0, 100]`.
    VitalsRange,
    /// Benefit without cost.
    Conservation,
    /// A nonzero ledger key is missing from the narrative.
    DiegeticIntegration,
    /// The narrative contains a forbidden phrase.
    ForbiddenPhrase,
    /// The narrative has no sensory anchor word.
    SensoryAnchor,
    /// The outcome log is missing its container or an entry.
    OutcomeLog,
    /// A survivor lost an affliction.
    AfflictionRemoved,
    /// A survivor is both alive and dead.
    PopulationOverlap,
    /// A threat escalated without a casualty.
    ThreatEscalation,
    /// Nobody is left alive.
    TerminalPopulation,
    /// Friction or resolve is not reflected in the narrative.
    FrictionResolve,
    /// The commander's visual anchor drifted or went unquoted.
    CommanderAnchor,
    /// The narrative source missed its deadline.
    NarrativeTimeout,
    /// The narrative source returned an error.
    NarrativeFailure,
}

impl ViolationKind {
    /// Stable tag for logs and machine-readable output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MapGrid => "map_grid",
            Self::VitalsRange => "vitals_range",
            Self::Conservation => "conservation",
            Self::DiegeticIntegration => "diegetic_integration",
            Self::ForbiddenPhrase => "forbidden_phrase",
            Self::SensoryAnchor => "sensory_anchor",
            Self::OutcomeLog => "outcome_log",
            Self::AfflictionRemoved => "affliction_removed",
            Self::PopulationOverlap => "population_overlap",
            Self::ThreatEscalation => "threat_escalation",
            Self::TerminalPopulation => "terminal_population",
            Self::FrictionResolve => "friction_resolve",
            Self::CommanderAnchor => "commander_anchor",
            Self::NarrativeTimeout => "narrative_timeout",
            Self::NarrativeFailure => "narrative_failure",
        }
    }

    /// Whether this violation ends the game rather than just the turn.
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::TerminalPopulation)
    }
}

impl core::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single broken rule with a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// The rule that was broken.
    pub kind: ViolationKind,
    /// Human-readable explanation.
    pub message: String,
}

impl Violation {
    /// Create a violation.
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether this violation ends the game.
    pub const fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

impl core::fmt::Display for Violation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.message)
    }
}

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------

/// Everything the checks may look at.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// The last committed state.
    pub previous: &'a EngineState,
    /// The state proposed for commit.
    pub candidate: &'a EngineState,
    /// Narrative prose for the candidate.
    pub narrative: &'a str,
    /// Outcome log for the candidate.
    pub outcome_log: &'a str,
    /// The turn's delta ledger.
    pub ledger: &'a [DeltaEntry],
}

/// A single independent check.
pub type Check = fn(&ValidationContext<'_>) -> Vec<Violation>;

/// The full battery, in reporting order.
pub const CHECKS: [Check; 13] = [
    check_map_grid,
    check_vitals,
    check_conservation,
    check_diegetic_integration,
    check_forbidden_phrases,
    check_sensory_anchors,
    check_outcome_log,
    check_afflictions,
    check_population_disjoint,
    check_threat_escalation,
    check_terminal_population,
    check_friction_resolve,
    check_commander_anchor,
];

/// Run every check and concatenate their violations in order.
pub fn validate_turn(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    CHECKS.iter().flat_map(|check| check(ctx)).collect()
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// The candidate map must be exactly 5 rows of 5 columns.
pub fn check_map_grid(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    let grid = &ctx.candidate.world.map_grid;
    let mut violations = Vec::new();
    if grid.len() != MAP_GRID_SIZE {
        violations.push(Violation::new(
            ViolationKind::MapGrid,
            format!("Map grid must be {MAP_GRID_SIZE} rows."),
        ));
    }
    for _ in grid.iter().filter(|row| row.len() != MAP_GRID_SIZE) {
        violations.push(Violation::new(
            ViolationKind::MapGrid,
            format!("Map grid must be {MAP_GRID_SIZE} columns."),
        ));
    }
    violations
}

/// Every candidate vital must lie in `[0, 100]`.
pub fn check_vitals(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    ctx.candidate
        .world
        .vitals
        .named()
        .into_iter()
        .filter(|(_, value)| !(Vitals::MIN..=Vitals::MAX).contains(value))
        .map(|(name, _)| {
            Violation::new(
                ViolationKind::VitalsRange,
                format!("{name} must be between {} and {}.", Vitals::MIN, Vitals::MAX),
            )
        })
        .collect()
}

/// A strictly positive ledger entry needs a strictly negative one beside it.
pub fn check_conservation(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    match verify_conservation(ctx.ledger) {
        ConservationResult::Balanced => Vec::new(),
        ConservationResult::Anomaly(anomaly) => {
            debug!(benefits = ?anomaly.benefits, "{anomaly}");
            vec![Violation::new(
                ViolationKind::Conservation,
                "Conservation violated: benefit without cost.",
            )]
        }
    }
}

/// Every nonzero ledger key must be named somewhere in the narrative.
pub fn check_diegetic_integration(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    let lower = ctx.narrative.to_lowercase();
    nonzero(ctx.ledger)
        .filter(|entry| !lower.contains(&entry.key.to_lowercase()))
        .map(|entry| {
            Violation::new(
                ViolationKind::DiegeticIntegration,
                format!("Delta for {} not referenced in narrative.", entry.key),
            )
        })
        .collect()
}

/// The narrative must not contain any of [`FORBIDDEN_PHRASES`].
pub fn check_forbidden_phrases(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    let lower = ctx.narrative.to_lowercase();
    FORBIDDEN_PHRASES
        .iter()
        .filter(|phrase| lower.contains(*phrase))
        .map(|phrase| {
            Violation::new(
                ViolationKind::ForbiddenPhrase,
                format!("Forbidden phrase found: {phrase}."),
            )
        })
        .collect()
}

/// The narrative must contain at least one of [`SENSORY_ANCHORS`].
pub fn check_sensory_anchors(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    let lower = ctx.narrative.to_lowercase();
    if SENSORY_ANCHORS.iter().any(|anchor| lower.contains(anchor)) {
        return Vec::new();
    }
    vec![Violation::new(
        ViolationKind::SensoryAnchor,
        format!(
            "Narrative lacks required sensory anchors ({}).",
            SENSORY_ANCHORS.join("/")
        ),
    )]
}

/// The outcome log must carry the container marker and every nonzero key.
///
/// Entries are only checked once the container is present.
pub fn check_outcome_log(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    if !ctx.outcome_log.contains(OUTCOME_LOG_MARKER) {
        return vec![Violation::new(
            ViolationKind::OutcomeLog,
            "Outcome log missing required container.",
        )];
    }
    let lower = ctx.outcome_log.to_lowercase();
    nonzero(ctx.ledger)
        .filter(|entry| !lower.contains(&entry.key.to_lowercase()))
        .map(|entry| {
            Violation::new(
                ViolationKind::OutcomeLog,
                format!("Outcome log missing entry for {}.", entry.key),
            )
        })
        .collect()
}

/// A survivor alive in both states keeps every affliction they had.
pub fn check_afflictions(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    let before: BTreeMap<&str, &[String]> = ctx
        .previous
        .survivors
        .roster
        .iter()
        .map(|s| (s.survivor_id.as_str(), s.afflictions.as_slice()))
        .collect();

    ctx.candidate
        .survivors
        .roster
        .iter()
        .filter(|survivor| {
            before
                .get(survivor.survivor_id.as_str())
                .is_some_and(|old| old.iter().any(|a| !survivor.afflictions.contains(a)))
        })
        .map(|survivor| {
            Violation::new(
                ViolationKind::AfflictionRemoved,
                format!("Afflictions removed for survivor {}.", survivor.survivor_id),
            )
        })
        .collect()
}

/// No survivor id may be in both the roster and the deceased list.
pub fn check_population_disjoint(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    let survivors = &ctx.candidate.survivors;
    let living: BTreeSet<&str> = survivors
        .roster
        .iter()
        .map(|s| s.survivor_id.as_str())
        .collect();
    let overlapping = survivors
        .deceased
        .iter()
        .any(|s| living.contains(s.survivor_id.as_str()));

    if !overlapping {
        return Vec::new();
    }
    vec![Violation::new(
        ViolationKind::PopulationOverlap,
        "Survivor appears in roster and deceased list.",
    )]
}

/// Each threat past the escalation threshold requires the roster to shrink.
pub fn check_threat_escalation(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    let population_fell = ctx.candidate.population() < ctx.previous.population();
    if population_fell {
        return Vec::new();
    }
    ctx.candidate
        .threats
        .active_threats
        .iter()
        .filter(|threat| threat.unaddressed_turns > ESCALATION_THRESHOLD)
        .map(|threat| {
            Violation::new(
                ViolationKind::ThreatEscalation,
                format!("Threat {} escalated without casualty.", threat.threat_id),
            )
        })
        .collect()
}

/// An empty roster ends the game.
pub fn check_terminal_population(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    if ctx.candidate.population() > 0 {
        return Vec::new();
    }
    vec![Violation::new(
        ViolationKind::TerminalPopulation,
        "Settlement lost: population is zero.",
    )]
}

/// High friction and low resolve must be visible in the narrative.
pub fn check_friction_resolve(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    let flags = ctx.candidate.flags;
    let lower = ctx.narrative.to_lowercase();
    let mut violations = Vec::new();

    if flags.friction >= FRICTION_UNREST_THRESHOLD
        && !UNREST_TOKENS.iter().any(|token| lower.contains(token))
    {
        violations.push(Violation::new(
            ViolationKind::FrictionResolve,
            "High friction without sabotage or mutiny signal in narrative.",
        ));
    }
    if flags.resolve < RESOLVE_FRACTURE_THRESHOLD && !lower.contains(FRACTURE_TOKEN) {
        violations.push(Violation::new(
            ViolationKind::FrictionResolve,
            "Low resolve without fragmented narrative signal.",
        ));
    }
    violations
}

/// The visual anchor must not change and, if set, must be quoted verbatim.
pub fn check_commander_anchor(ctx: &ValidationContext<'_>) -> Vec<Violation> {
    let anchor = &ctx.candidate.commander.visual_anchor;
    let mut violations = Vec::new();

    if ctx.previous.commander.visual_anchor != *anchor {
        violations.push(Violation::new(
            ViolationKind::CommanderAnchor,
            "Commander visual anchor drift detected.",
        ));
    }
    if !anchor.is_empty() && !ctx.narrative.contains(anchor.as_str()) {
        violations.push(Violation::new(
            ViolationKind::CommanderAnchor,
            "Commander visual anchor missing from narrative.",
        ));
    }
    violations
}

fn nonzero(ledger: &[DeltaEntry]) -> impl Iterator<Item = &DeltaEntry> {
    ledger.iter().filter(|entry| entry.value != 0)
}
