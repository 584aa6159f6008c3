//! System prompt rendering via `minijinja`.
//!
//! The system prompt is the style and rule sheet handed to a
//! [`NarrativeSource`](crate::narrative::NarrativeSource). It is rendered
//! from `gm_system.j2` in a templates directory so operators can tune the
//! voice without recompiling; when no directory is configured a built-in
//! template is used.

use std::path::{Path, PathBuf};

use minijinja::Environment;
use serde::Serialize;

use ebonfall_types::{CommanderState, EngineState, SimulationFlags, WorldState};

use crate::validation::{
    FORBIDDEN_PHRASES, FRICTION_UNREST_THRESHOLD, RESOLVE_FRACTURE_THRESHOLD, SENSORY_ANCHORS,
};

/// File name of the system prompt template inside a templates directory.
pub const SYSTEM_TEMPLATE_FILE: &str = "gm_system.j2";

const SYSTEM_TEMPLATE: &str = "gm_system";

const DEFAULT_SYSTEM_TEMPLATE: &str = "\
You are the chronicler of a settlement at the edge of Ebonfall.
Write in the first person plural, in plain and physical language.

Commander {{ commander.name }} of {{ commander.origin }} leads by {{ commander.ideology }}.
Always quote the commander's visual anchor exactly: \"{{ commander.visual_anchor }}\".

It is turn {{ world.turn }}, {{ world.season }} {{ world.phase }}; the settlement is an {{ world.settlement_tier }}.

Rules:
- Name every resource or vital that changed.
- Mention at least one of: {{ sensory_anchors | join(\", \") }}.
- Never write: {{ forbidden_phrases | join(\", \") }}.
{%- if flags.friction >= friction_threshold %}
- Friction is high ({{ flags.friction }}): show sabotage or mutiny.
{%- endif %}
{%- if flags.resolve < resolve_threshold %}
- Resolve is low ({{ flags.resolve }}): let the telling break into fragments.
{%- endif %}
";

/// Errors raised while loading or rendering the system prompt.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// The template file could not be read.
    #[error("failed to read template {}: {source}", path.display())]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The template failed to compile or render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Values exposed to the template.
#[derive(Debug, Serialize)]
struct PromptContext<'a> {
    commander: &'a CommanderState,
    world: &'a WorldState,
    flags: SimulationFlags,
    sensory_anchors: &'a [&'a str],
    forbidden_phrases: &'a [&'a str],
    friction_threshold: i64,
    resolve_threshold: i64,
}

/// Renders the system prompt for a given state.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Load `gm_system.j2` from `templates_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Io`] if the file cannot be read, or
    /// [`PromptError::Template`] if it does not compile.
    pub fn new(templates_dir: &Path) -> Result<Self, PromptError> {
        let path = templates_dir.join(SYSTEM_TEMPLATE_FILE);
        match std::fs::read_to_string(&path) {
            Ok(source) => Self::from_source(source),
            Err(source) => Err(PromptError::Io { path, source }),
        }
    }

    /// Use the built-in system prompt template.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Template`] if the built-in template fails to
    /// compile.
    pub fn with_default() -> Result<Self, PromptError> {
        Self::from_source(DEFAULT_SYSTEM_TEMPLATE.to_owned())
    }

    /// Compile a template from source text.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Template`] if the source does not compile.
    pub fn from_source(source: String) -> Result<Self, PromptError> {
        let mut env = Environment::new();
        env.add_template_owned(SYSTEM_TEMPLATE, source)?;
        Ok(Self { env })
    }

    /// Render the system prompt for `state`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Template`] if rendering fails.
    pub fn render(&self, state: &EngineState) -> Result<String, PromptError> {
        let context = PromptContext {
            commander: &state.commander,
            world: &state.world,
            flags: state.flags,
            sensory_anchors: &SENSORY_ANCHORS,
            forbidden_phrases: &FORBIDDEN_PHRASES,
            friction_threshold: FRICTION_UNREST_THRESHOLD,
            resolve_threshold: RESOLVE_FRACTURE_THRESHOLD,
        };
        let rendered = self.env.get_template(SYSTEM_TEMPLATE)?.render(context)?;
        Ok(rendered)
    }
}
