//! Command-line argument parsing.

use std::path::PathBuf;

/// Usage text printed on `--help` or a malformed command line.
pub const USAGE: &str = "\
usage: ebonfall --fixture <state.json> [--turn <turn.json>] [--config <file.yaml>]

  --fixture <path>   initial EngineState JSON
  --turn <path>      TurnInput JSON (read from stdin when omitted)
  --config <path>    engine configuration YAML
  -h, --help         print this message";

/// Errors produced while parsing the command line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgsError {
    /// `--help` was requested.
    #[error("help requested")]
    Help,

    /// A required flag was not given.
    #[error("missing required argument {0}")]
    Missing(&'static str),

    /// A flag was given without its value.
    #[error("{0} requires a value")]
    MissingValue(String),

    /// An argument was not recognized.
    #[error("unrecognized argument {0:?}")]
    Unknown(String),
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// Path to the initial state fixture.
    pub fixture: PathBuf,
    /// Path to the turn input, or `None` for stdin.
    pub turn: Option<PathBuf>,
    /// Path to the configuration file.
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// Parse arguments, excluding the program name.
    ///
    /// # Errors
    ///
    /// Returns [`ArgsError`] on `--help`, an unknown flag, a flag without a
    /// value, or a missing `--fixture`.
    pub fn parse<I>(args: I) -> Result<Self, ArgsError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut fixture = None;
        let mut turn = None;
        let mut config = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let slot = match arg.as_str() {
                "-h" | "--help" => return Err(ArgsError::Help),
                "--fixture" => &mut fixture,
                "--turn" => &mut turn,
                "--config" => &mut config,
                _ => return Err(ArgsError::Unknown(arg)),
            };
            let value = args.next().ok_or_else(|| ArgsError::MissingValue(arg.clone()))?;
            *slot = Some(PathBuf::from(value));
        }

        Ok(Self {
            fixture: fixture.ok_or(ArgsError::Missing("--fixture"))?,
            turn,
            config,
        })
    }
}
