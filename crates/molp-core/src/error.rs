//! Top-level error wiring: the driver loop matches on a single enum
//! to decide the process exit code, per the error-handling design
//! (`InputError`/`OracleError`/`NumericalError`/`OutOfMemory` collapse
//! into library-level `thiserror` enums; the CLI layer wraps anything
//! else in `anyhow`).

use crate::engine::EngineError;
use crate::params::ConfigError;
use crate::vlp::VlpError;
use thiserror::Error;

/// Errors that can occur before the engine ever starts: malformed
/// input files or configuration. Maps to exit code 1.
#[derive(Debug, Error)]
pub enum InputError {
    #[error(transparent)]
    Vlp(#[from] VlpError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Exit-code classification for a terminated run, independent of
/// *how* the driver loop chooses to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Normal,
    InputError,
    NumericalError,
    Interrupted,
    PostExtractError,
    PostExtractInterrupted,
}

impl ExitKind {
    pub fn code(self) -> i32 {
        match self {
            ExitKind::Normal => 0,
            ExitKind::InputError => 1,
            ExitKind::NumericalError => 2,
            ExitKind::Interrupted => 3,
            ExitKind::PostExtractError => 4,
            ExitKind::PostExtractInterrupted => 5,
        }
    }
}

/// Classifies a fatal `EngineError` into the exit-code table of
/// §4.3.8/§7: oracle errors and numerical errors are both fatal to
/// the engine and both report exit code 2.
pub fn classify_engine_error(err: &EngineError) -> ExitKind {
    match err {
        EngineError::Oracle(_) => ExitKind::NumericalError,
        EngineError::Numerical(_) => ExitKind::NumericalError,
        EngineError::OutOfMemory(_) => ExitKind::NumericalError,
    }
}
