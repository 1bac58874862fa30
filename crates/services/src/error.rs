//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::SettingsError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::sessions::SessionPhase;

/// Errors emitted by `QuestionSampler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SamplerError {
    #[error("question catalogue is empty")]
    EmptyCatalogue,
}

/// Errors emitted by the session controller.
///
/// Every rejected command leaves the session untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("select a line before submitting")]
    NoLineSelected,
    #[error("line {line} is outside the snippet (1..={len})")]
    LineOutOfRange { line: u32, len: usize },
    #[error("cannot {action} while {phase}")]
    InvalidPhase {
        phase: SessionPhase,
        action: &'static str,
    },
    #[error("rounds remain; use next instead of finish")]
    RoundsRemaining,
    #[error("this was the last round; use finish instead of next")]
    LastRound,
}

/// Errors emitted by identity providers. Sign-in may be retried after any of them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("sign-in was cancelled")]
    Cancelled,
    #[error("sign-in failed: {0}")]
    Failed(String),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}
