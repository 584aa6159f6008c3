//! Turn orchestrator: the single `Pending -> Resolved` transition.
//!
//! [`TurnEngine::resolve`] takes ownership of the last committed state and
//! returns it either replaced by the validated candidate
//! ([`TurnOutcome::Committed`]) or unchanged alongside every reason it was
//! kept ([`TurnOutcome::Rejected`]). Nothing in between is observable: the
//! candidate and its chronicle entry exist only inside the call.
//!
//! The narrative call is the one suspension point. It runs under
//! [`TurnEngine::narrative_timeout`]; a source that errors or overruns
//! rejects the turn like any validator violation.
//!
//! The engine holds no state across calls. Callers serialize `resolve` per
//! world, e.g. by owning the state in a single task.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use ebonfall_types::{ChronicleEntry, EngineState, TurnInput};

use crate::config::NarrativeConfig;
use crate::delta::derive_candidate;
use crate::narrative::{NarrativeRequest, NarrativeResult, NarrativeSource};
use crate::validation::{ValidationContext, Violation, ViolationKind, validate_turn};

/// Result of resolving one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Every check passed; `state` is the new authoritative state.
    Committed {
        /// The committed candidate, with one new chronicle entry.
        state: EngineState,
        /// The narrative that justified it.
        narrative: NarrativeResult,
    },
    /// At least one check failed; `state` is the previous state, untouched.
    Rejected {
        /// The previous state, returned unchanged.
        state: EngineState,
        /// Every violation, in check order.
        violations: Vec<Violation>,
        /// The discarded narrative, if one was produced.
        narrative: Option<NarrativeResult>,
    },
}

impl TurnOutcome {
    /// Whether the turn committed.
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    /// Whether the rejection ends the game.
    pub fn is_terminal(&self) -> bool {
        self.violations().iter().any(Violation::is_fatal)
    }

    /// The authoritative state after this turn.
    pub const fn state(&self) -> &EngineState {
        match self {
            Self::Committed { state, .. } | Self::Rejected { state, .. } => state,
        }
    }

    /// Take the authoritative state.
    pub fn into_state(self) -> EngineState {
        match self {
            Self::Committed { state, .. } | Self::Rejected { state, .. } => state,
        }
    }

    /// Violations of a rejected turn; empty when committed.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Committed { .. } => &[],
            Self::Rejected { violations, .. } => violations,
        }
    }

    /// Violation messages, in check order.
    pub fn errors(&self) -> Vec<String> {
        self.violations().iter().map(ToString::to_string).collect()
    }

    /// The narrative, committed or discarded.
    pub const fn narrative(&self) -> Option<&NarrativeResult> {
        match self {
            Self::Committed { narrative, .. } => Some(narrative),
            Self::Rejected { narrative, .. } => narrative.as_ref(),
        }
    }
}

/// Resolves turns against a narrative source.
#[derive(Debug, Clone)]
pub struct TurnEngine<N> {
    narrator: N,
    system_prompt: String,
    narrative_timeout: Duration,
}

impl<N: NarrativeSource + Sync> TurnEngine<N> {
    /// Create an engine with the default narrative timeout.
    pub fn new(narrator: N, system_prompt: impl Into<String>) -> Self {
        Self::from_config(narrator, system_prompt, &NarrativeConfig::default())
    }

    /// Create an engine using the timeout from `config`.
    pub fn from_config(
        narrator: N,
        system_prompt: impl Into<String>,
        config: &NarrativeConfig,
    ) -> Self {
        Self {
            narrator,
            system_prompt: system_prompt.into(),
            narrative_timeout: config.timeout(),
        }
    }

    /// Replace the narrative timeout.
    #[must_use]
    pub const fn with_timeout(mut self, narrative_timeout: Duration) -> Self {
        self.narrative_timeout = narrative_timeout;
        self
    }

    /// The narrative source.
    pub const fn narrator(&self) -> &N {
        &self.narrator
    }

    /// The system prompt handed to the narrative source.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Deadline for one narrative call.
    pub const fn narrative_timeout(&self) -> Duration {
        self.narrative_timeout
    }

    /// Resolve one turn.
    ///
    /// Returns [`TurnOutcome::Committed`] with the candidate state when every
    /// check passes, and [`TurnOutcome::Rejected`] with `previous` otherwise.
    pub async fn resolve(&self, previous: EngineState, input: &TurnInput) -> TurnOutcome {
        let turn = previous.world.turn;

        let draft = match derive_candidate(&previous, input) {
            Ok(draft) => draft,
            Err(e) => {
                warn!(turn, error = %e, "turn refused before derivation");
                return reject(
                    previous,
                    vec![Violation::new(ViolationKind::TerminalPopulation, e.to_string())],
                    None,
                );
            }
        };

        let request = NarrativeRequest {
            state: &draft.candidate,
            ledger: &draft.ledger,
            system_prompt: &self.system_prompt,
        };

        let narrative = match timeout(self.narrative_timeout, self.narrator.narrate(request)).await
        {
            Ok(Ok(narrative)) => narrative,
            Ok(Err(e)) => {
                warn!(
                    turn,
                    narrator = self.narrator.name(),
                    error = %e,
                    "narrative source failed, rejecting turn"
                );
                let violation = Violation::new(
                    ViolationKind::NarrativeFailure,
                    format!("Narrative generation failed: {e}."),
                );
                return reject(previous, vec![violation], None);
            }
            Err(_) => {
                warn!(
                    turn,
                    narrator = self.narrator.name(),
                    timeout_ms = self.narrative_timeout.as_millis(),
                    "narrative deadline exceeded, rejecting turn"
                );
                let violation = Violation::new(
                    ViolationKind::NarrativeTimeout,
                    format!(
                        "Narrative generation timed out after {} ms.",
                        self.narrative_timeout.as_millis()
                    ),
                );
                return reject(previous, vec![violation], None);
            }
        };

        let violations = validate_turn(&ValidationContext {
            previous: &previous,
            candidate: &draft.candidate,
            narrative: &narrative.narrative,
            outcome_log: &narrative.outcome_log,
            ledger: draft.ledger.entries(),
        });

        if !violations.is_empty() {
            return reject(previous, violations, Some(narrative));
        }

        let mut state = draft.candidate;
        state.chronicle.record(ChronicleEntry {
            turn: state.world.turn,
            narrative: narrative.narrative.clone(),
            outcome_log: narrative.outcome_log.clone(),
            deltas: draft.ledger.into_entries(),
        });

        info!(
            turn,
            narrator = self.narrator.name(),
            population = state.population(),
            casualties = draft.escalation_casualties.len(),
            history = state.chronicle.history.len(),
            "turn committed"
        );

        TurnOutcome::Committed { state, narrative }
    }
}

fn reject(
    previous: EngineState,
    violations: Vec<Violation>,
    narrative: Option<NarrativeResult>,
) -> TurnOutcome {
    for violation in &violations {
        debug!(kind = %violation.kind, message = %violation.message, "violation");
    }
    warn!(
        turn = previous.world.turn,
        violations = violations.len(),
        fatal = violations.iter().any(Violation::is_fatal),
        "turn rejected"
    );
    TurnOutcome::Rejected {
        state: previous,
        violations,
        narrative,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::future::{Future, ready};

    use super::*;
    use crate::narrative::{NarrativeError, TemplateNarrator};
    use crate::testing::{sample_state, threat, with_threat};
    use ebonfall_types::TurnAction;

    /// Returns the same canned narrative for every request.
    struct FixedNarrator(NarrativeResult);

    impl NarrativeSource for FixedNarrator {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn narrate(
            &self,
            _request: NarrativeRequest<'_>,
        ) -> impl Future<Output = Result<NarrativeResult, NarrativeError>> + Send {
            ready(Ok(self.0.clone()))
        }
    }

    /// Sleeps past any sensible deadline before answering.
    struct SlowNarrator(Duration);

    impl NarrativeSource for SlowNarrator {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn narrate(
            &self,
            request: NarrativeRequest<'_>,
        ) -> impl Future<Output = Result<NarrativeResult, NarrativeError>> + Send {
            let delay = self.0;
            let result = TemplateNarrator::compose(request);
            async move {
                tokio::time::sleep(delay).await;
                Ok(result)
            }
        }
    }

    struct FailingNarrator;

    impl NarrativeSource for FailingNarrator {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn narrate(
            &self,
            _request: NarrativeRequest<'_>,
        ) -> impl Future<Output = Result<NarrativeResult, NarrativeError>> + Send {
            ready(Err(NarrativeError::Backend("connection refused".to_owned())))
        }
    }

    fn engine() -> TurnEngine<TemplateNarrator> {
        TurnEngine::new(TemplateNarrator::new(), "gm")
    }

    fn trade(food: i64, wood: i64) -> TurnInput {
        let mut action = TurnAction::new("Trade timber for rations");
        action.resource_deltas.insert("Food".to_owned(), food);
        action.resource_deltas.insert("Wood".to_owned(), wood);
        TurnInput::from(action)
    }

    #[tokio::test]
    async fn balanced_turn_commits_with_chronicle_entry() {
        let outcome = engine().resolve(sample_state(), &trade(2, -1)).await;
        assert!(outcome.is_committed(), "{:?}", outcome.errors());

        let state = outcome.state();
        assert_eq!(state.world.resources.food, 12);
        assert_eq!(state.world.resources.wood, 9);
        assert_eq!(state.world.turn, 1);
        assert_eq!(state.chronicle.history.len(), 1);

        let entry = &state.chronicle.history[0];
        assert_eq!(entry.turn, 1);
        assert_eq!(entry.narrative, outcome.narrative().unwrap().narrative);
        assert_eq!(state.chronicle.resource_trends.get("Food"), Some(&2));
        assert_eq!(state.chronicle.resource_trends.get("Wood"), Some(&-1));
    }

    #[tokio::test]
    async fn free_benefit_is_rejected_and_state_untouched() {
        let previous = sample_state();
        let mut action = TurnAction::new("Find a cache");
        action.resource_deltas.insert("Food".to_owned(), 4);

        let outcome = engine().resolve(previous.clone(), &action.into()).await;
        assert!(!outcome.is_committed());
        assert!(!outcome.is_terminal());
        assert_eq!(outcome.state(), &previous);
        assert!(outcome.errors().iter().any(|e| e.contains("Conservation violated")));
        assert!(outcome.narrative().is_some());
    }

    #[tokio::test]
    async fn narrative_missing_ledger_key_is_rejected() {
        let canned = NarrativeResult {
            narrative: format!(
                "Wood fell by 1. Cold mud. \"{}.\"",
                crate::testing::ANCHOR
            ),
            outcome_log: "<div class=\"outcome-log\"><li>Food: +2</li><li>Wood: -1</li></div>"
                .to_owned(),
            deltas: Vec::new(),
            system_prompt: "gm".to_owned(),
        };
        let engine = TurnEngine::new(FixedNarrator(canned), "gm");

        let outcome = engine.resolve(sample_state(), &trade(2, -1)).await;
        assert_eq!(
            outcome.errors(),
            vec!["Delta for Food not referenced in narrative.".to_owned()]
        );
    }

    #[tokio::test]
    async fn empty_roster_is_terminal_without_narrative() {
        let mut previous = sample_state();
        previous.survivors.roster.clear();

        let outcome = engine().resolve(previous, &trade(2, -1)).await;
        assert!(outcome.is_terminal());
        assert!(outcome.narrative().is_none());
        assert_eq!(outcome.errors(), vec!["Settlement lost: population is zero.".to_owned()]);
    }

    #[tokio::test]
    async fn last_survivor_lost_is_terminal() {
        let mut previous = sample_state();
        previous.survivors.roster.truncate(1);
        let mut action = TurnAction::new("Hold the gate");
        action.deceased_ids.push("s1".to_owned());
        action.resource_deltas.insert("Food".to_owned(), -1);

        let outcome = engine().resolve(previous, &action.into()).await;
        assert!(outcome.is_terminal());
        assert!(outcome.narrative().is_some());
        assert_eq!(outcome.state().population(), 1);
    }

    #[tokio::test]
    async fn escalating_threat_claims_a_survivor() {
        let previous = with_threat(sample_state(), threat("t1", 2));
        let outcome = engine().resolve(previous, &trade(1, -1)).await;
        assert!(outcome.is_committed(), "{:?}", outcome.errors());

        let state = outcome.state();
        assert_eq!(state.population(), 1);
        assert_eq!(state.survivors.deceased[0].survivor_id, "s1");
        assert_eq!(state.chronicle.resource_trends.get("Population"), Some(&-1));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_narrative_times_out() {
        let engine = TurnEngine::new(SlowNarrator(Duration::from_secs(30)), "gm")
            .with_timeout(Duration::from_millis(100));
        let previous = sample_state();

        let outcome = engine.resolve(previous.clone(), &trade(2, -1)).await;
        assert_eq!(outcome.state(), &previous);
        assert_eq!(outcome.violations().len(), 1);
        assert_eq!(outcome.violations()[0].kind, ViolationKind::NarrativeTimeout);
        assert!(outcome.narrative().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn narrative_within_deadline_commits() {
        let engine = TurnEngine::new(SlowNarrator(Duration::from_millis(50)), "gm")
            .with_timeout(Duration::from_millis(100));
        let outcome = engine.resolve(sample_state(), &trade(2, -1)).await;
        assert!(outcome.is_committed(), "{:?}", outcome.errors());
    }

    #[tokio::test]
    async fn narrative_failure_rejects() {
        let engine = TurnEngine::new(FailingNarrator, "gm");
        let outcome = engine.resolve(sample_state(), &trade(2, -1)).await;
        assert_eq!(outcome.violations()[0].kind, ViolationKind::NarrativeFailure);
        assert!(outcome.errors()[0].contains("connection refused"));
    }

    #[tokio::test]
    async fn resolution_is_deterministic() {
        let first = engine().resolve(sample_state(), &trade(3, -2)).await;
        let second = engine().resolve(sample_state(), &trade(3, -2)).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn trends_accumulate_across_turns() {
        let engine = engine();
        let state = engine.resolve(sample_state(), &trade(2, -1)).await.into_state();
        let state = engine.resolve(state, &trade(3, -2)).await.into_state();

        assert_eq!(state.chronicle.history.len(), 2);
        assert_eq!(state.chronicle.resource_trends.get("Food"), Some(&5));
        assert_eq!(state.chronicle.resource_trends.get("Wood"), Some(&-3));
    }

    #[test]
    fn timeout_comes_from_config() {
        let config = NarrativeConfig {
            timeout_ms: 1234,
            templates_dir: None,
        };
        let engine = TurnEngine::from_config(TemplateNarrator::new(), "gm", &config);
        assert_eq!(engine.narrative_timeout(), Duration::from_millis(1234));
        assert_eq!(engine.system_prompt(), "gm");
        assert_eq!(engine.narrator().name(), "template");
    }
}
