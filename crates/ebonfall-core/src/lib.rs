//! Turn resolution and consistency validation for the Ebonfall turn engine.
//!
//! This crate owns the pipeline that turns a committed [`EngineState`] and a
//! player's [`TurnInput`] into either a new committed state or a rejection:
//!
//! ```text
//! previous state + action
//!     --> delta applier      (candidate state + delta ledger)
//!     --> narrative source   (prose + outcome log, bounded by a deadline)
//!     --> validator          (ordered battery of independent checks)
//!     --> commit | reject
//! ```
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `ebonfall-config.yaml`.
//! - [`delta`] -- Pure builder functions deriving the candidate state.
//! - [`narrative`] -- [`NarrativeSource`] trait and [`TemplateNarrator`].
//! - [`prompt`] -- System prompt rendering via `minijinja`.
//! - [`validation`] -- The consistency validator.
//! - [`turn`] -- The [`TurnEngine`] orchestrator.
//!
//! [`EngineState`]: ebonfall_types::EngineState
//! [`TurnInput`]: ebonfall_types::TurnInput
//! [`NarrativeSource`]: narrative::NarrativeSource
//! [`TemplateNarrator`]: narrative::TemplateNarrator
//! [`TurnEngine`]: turn::TurnEngine

pub mod config;
pub mod delta;
pub mod narrative;
pub mod prompt;
pub mod turn;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;
