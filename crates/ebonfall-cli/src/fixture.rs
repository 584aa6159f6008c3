//! Loading world fixtures and turn inputs from JSON.
//!
//! All structural validation happens here through `serde`: an unknown enum
//! value or a missing required field is reported before the turn engine is
//! ever invoked.

use std::io::Read;
use std::path::{Path, PathBuf};

use ebonfall_types::{EngineState, TurnInput};

/// Errors raised while reading or decoding input documents.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// A file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Standard input could not be read.
    #[error("failed to read turn input from stdin: {0}")]
    Stdin(#[source] std::io::Error),

    /// A document was not valid for its type.
    #[error("invalid {kind}: {source}")]
    Decode {
        /// Which document failed (`state fixture` or `turn input`).
        kind: &'static str,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// Decode an [`EngineState`] fixture. The chronicle may be omitted.
///
/// # Errors
///
/// Returns [`FixtureError::Decode`] if the document is malformed.
pub fn parse_state(json: &str) -> Result<EngineState, FixtureError> {
    serde_json::from_str(json).map_err(|source| FixtureError::Decode {
        kind: "state fixture",
        source,
    })
}

/// Decode a [`TurnInput`].
///
/// # Errors
///
/// Returns [`FixtureError::Decode`] if the document is malformed.
pub fn parse_turn_input(json: &str) -> Result<TurnInput, FixtureError> {
    serde_json::from_str(json).map_err(|source| FixtureError::Decode {
        kind: "turn input",
        source,
    })
}

/// Read and decode a state fixture from `path`.
///
/// # Errors
///
/// Returns [`FixtureError::Read`] or [`FixtureError::Decode`].
pub fn load_state(path: &Path) -> Result<EngineState, FixtureError> {
    parse_state(&read_file(path)?)
}

/// Read and decode a turn input from `path`, or from stdin when `None`.
///
/// # Errors
///
/// Returns [`FixtureError::Read`], [`FixtureError::Stdin`], or
/// [`FixtureError::Decode`].
pub fn load_turn_input(path: Option<&Path>) -> Result<TurnInput, FixtureError> {
    let json = match path {
        Some(path) => read_file(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(FixtureError::Stdin)?;
            buf
        }
    };
    parse_turn_input(&json)
}

fn read_file(path: &Path) -> Result<String, FixtureError> {
    std::fs::read_to_string(path).map_err(|source| FixtureError::Read {
        path: path.to_path_buf(),
        source,
    })
}
