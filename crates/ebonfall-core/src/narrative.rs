//! Narrative source trait and the deterministic template narrator.
//!
//! After the delta applier produces a candidate state, the orchestrator asks
//! a [`NarrativeSource`] to describe it. The source may be the built-in
//! [`TemplateNarrator`], a scripted stub in tests, or a remote text
//! generator. The validator treats every source as untrusted and re-checks
//! its output, so a source only has to honor the structural contract:
//!
//! - the commander's visual anchor appears verbatim;
//! - every nonzero ledger key is mentioned in the prose;
//! - the outcome log sits inside the [`OUTCOME_LOG_MARKER`] container and
//!   lists every ledger entry with an explicit sign.

use std::future::{Future, ready};

use serde::{Deserialize, Serialize};

use ebonfall_ledger::DeltaLedger;
use ebonfall_types::{DeltaEntry, EngineState};

use crate::validation::{FRICTION_UNREST_THRESHOLD, RESOLVE_FRACTURE_THRESHOLD, SENSORY_ANCHORS};

/// Opening tag of the outcome log container.
pub const OUTCOME_LOG_MARKER: &str = "<div class=\"outcome-log\">";

/// Errors a narrative source can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NarrativeError {
    /// The backing generator failed or was unreachable.
    #[error("narrative backend error: {0}")]
    Backend(String),

    /// The generator answered with something that is not a narrative.
    #[error("malformed narrative: {0}")]
    Malformed(String),
}

/// Everything a narrative source may look at.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeRequest<'a> {
    /// The candidate state to describe.
    pub state: &'a EngineState,
    /// The turn's delta ledger.
    pub ledger: &'a DeltaLedger,
    /// Style and rule instructions for the generator.
    pub system_prompt: &'a str,
}

/// A generated description of a candidate state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeResult {
    /// Prose shown to the player.
    pub narrative: String,
    /// Structured outcome log.
    pub outcome_log: String,
    /// The ledger the narrative describes.
    pub deltas: Vec<DeltaEntry>,
    /// The system prompt the narrative was generated under.
    pub system_prompt: String,
}

/// A source of turn narratives.
///
/// The returned future is awaited by the orchestrator under a deadline; a
/// source that never completes costs the turn, not the process.
pub trait NarrativeSource {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Describe the candidate state in `request`.
    ///
    /// # Errors
    ///
    /// Returns [`NarrativeError`] if no narrative could be produced.
    fn narrate(
        &self,
        request: NarrativeRequest<'_>,
    ) -> impl Future<Output = Result<NarrativeResult, NarrativeError>> + Send;
}

// ---------------------------------------------------------------------------
// Template narrator
// ---------------------------------------------------------------------------

/// Deterministic narrator built from fixed sentence templates.
///
/// Given the same request it always produces the same narrative, which
/// makes rejected turns reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrator;

impl TemplateNarrator {
    /// Create a new template narrator.
    pub const fn new() -> Self {
        Self
    }

    /// Build the narrative synchronously.
    pub fn compose(request: NarrativeRequest<'_>) -> NarrativeResult {
        let state = request.state;
        let summary = describe_delta_items(request.ledger);

        let mut sentences = vec![format!(
            "{:?} {:?}, turn {}.",
            state.world.season, state.world.phase, state.world.turn
        )];
        if summary.is_empty() {
            sentences.push("The tally did not move.".to_owned());
        } else {
            sentences.push(format!("The tally: {summary}."));
        }
        sentences.push("Grit hung in the air and settled on every ration sack.".to_owned());

        if state.flags.friction >= FRICTION_UNREST_THRESHOLD {
            sentences
                .push("Sabotage whispered between the tents; a rope was cut at the gate.".to_owned());
        }
        if state.flags.resolve < RESOLVE_FRACTURE_THRESHOLD {
            sentences
                .push("The day came apart in fragments: a shout, a door, a long silence.".to_owned());
        }

        sentences.push(format!(
            "<span class=\"survivor-quote\">\"We held, Commander. {}.\"</span>",
            state.commander.visual_anchor
        ));
        let prose = sentences.join(" ");

        NarrativeResult {
            narrative: ensure_sensory_anchor(prose),
            outcome_log: format_outcome_log(request.ledger.entries()),
            deltas: request.ledger.entries().to_vec(),
            system_prompt: request.system_prompt.to_owned(),
        }
    }
}

impl NarrativeSource for TemplateNarrator {
    fn name(&self) -> &'static str {
        "template"
    }

    fn narrate(
        &self,
        request: NarrativeRequest<'_>,
    ) -> impl Future<Output = Result<NarrativeResult, NarrativeError>> + Send {
        ready(Ok(Self::compose(request)))
    }
}

/// One clause per nonzero entry, e.g. `Food rose by 4; Wood fell by 2`.
pub fn describe_delta_items(ledger: &DeltaLedger) -> String {
    ledger
        .nonzero()
        .map(|entry| {
            let direction = if entry.value > 0 { "rose" } else { "fell" };
            format!("{} {direction} by {}", entry.key, entry.value.unsigned_abs())
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Render every ledger entry, zero or not, inside the outcome log container.
pub fn format_outcome_log(entries: &[DeltaEntry]) -> String {
    let items = entries
        .iter()
        .map(|entry| {
            let sign = if entry.value >= 0 { "+" } else { "" };
            format!("<li>{}: {sign}{}</li>", entry.key, entry.value)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{OUTCOME_LOG_MARKER}\n<ul>\n{items}\n</ul>\n</div>")
}

/// Append a closing sentence naming the sensory anchors if none is present.
fn ensure_sensory_anchor(text: String) -> String {
    let lower = text.to_lowercase();
    if SENSORY_ANCHORS.iter().any(|anchor| lower.contains(anchor)) {
        return text;
    }
    format!("{text} The mud, the rust, and the cold stayed with us.")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{ANCHOR, sample_state};

    fn ledger(entries: &[(&str, i64)]) -> DeltaLedger {
        let mut ledger = DeltaLedger::new();
        for (key, value) in entries {
            ledger.record(key, *value);
        }
        ledger
    }

    fn compose(state: &EngineState, ledger: &DeltaLedger) -> NarrativeResult {
        TemplateNarrator::compose(NarrativeRequest {
            state,
            ledger,
            system_prompt: "gm",
        })
    }

    #[test]
    fn clauses_describe_direction_and_magnitude() {
        let summary = describe_delta_items(&ledger(&[("Food", 4), ("Wood", -2), ("Stone", 0)]));
        assert_eq!(summary, "Food rose by 4; Wood fell by 2");
    }

    #[test]
    fn outcome_log_lists_every_entry_with_sign() {
        let log = format_outcome_log(ledger(&[("Food", 4), ("Wood", -2), ("Stone", 0)]).entries());
        assert!(log.starts_with(OUTCOME_LOG_MARKER));
        assert!(log.contains("<li>Food: +4</li>"));
        assert!(log.contains("<li>Wood: -2</li>"));
        assert!(log.contains("<li>Stone: +0</li>"));
    }

    #[test]
    fn narrative_quotes_anchor_verbatim() {
        let result = compose(&sample_state(), &ledger(&[("Food", 4), ("Wood", -2)]));
        assert!(result.narrative.contains(ANCHOR));
        assert!(result.narrative.contains("Food rose by 4"));
        assert!(result.narrative.contains("Wood fell by 2"));
        assert_eq!(result.system_prompt, "gm");
        assert_eq!(result.deltas.len(), 2);
    }

    #[test]
    fn name_outlives_the_narrator() {
        let name = {
            let narrator = TemplateNarrator::new();
            narrator.name()
        };
        assert_eq!(name, "template");
    }

    #[test]
    fn high_friction_adds_sabotage() {
        let mut state = sample_state();
        state.flags.friction = 40;
        let result = compose(&state, &DeltaLedger::new());
        assert!(result.narrative.to_lowercase().contains("sabotage"));
    }

    #[test]
    fn low_resolve_adds_fragments() {
        let mut state = sample_state();
        state.flags.resolve = 19;
        let result = compose(&state, &DeltaLedger::new());
        assert!(result.narrative.contains("fragment"));
    }

    #[test]
    fn calm_flags_add_neither_signal() {
        let result = compose(&sample_state(), &DeltaLedger::new());
        let lower = result.narrative.to_lowercase();
        assert!(!lower.contains("sabotage"));
        assert!(!lower.contains("fragment"));
    }

    #[test]
    fn missing_sensory_anchor_is_appended() {
        let mut state = sample_state();
        state.commander.visual_anchor = "a grey scarf".to_owned();
        let result = compose(&state, &DeltaLedger::new());
        assert!(result.narrative.ends_with("The mud, the rust, and the cold stayed with us."));
    }

    #[test]
    fn present_sensory_anchor_is_not_duplicated() {
        let result = compose(&sample_state(), &DeltaLedger::new());
        assert!(!result.narrative.contains("stayed with us"));
    }

    #[test]
    fn composition_is_deterministic() {
        let state = sample_state();
        let ledger = ledger(&[("Food", 1), ("Iron", -1)]);
        assert_eq!(compose(&state, &ledger), compose(&state, &ledger));
    }

    #[tokio::test]
    async fn narrate_wraps_compose() {
        let state = sample_state();
        let ledger = ledger(&[("Food", 1), ("Iron", -1)]);
        let request = NarrativeRequest {
            state: &state,
            ledger: &ledger,
            system_prompt: "gm",
        };
        let result = TemplateNarrator::new().narrate(request).await.unwrap();
        assert_eq!(result, TemplateNarrator::compose(request));
    }
}
