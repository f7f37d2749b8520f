//! Oracle access errors.

use crate::error::{ErrorSeverity, SimError};

/// Errors that occur when accessing oracle services.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OracleError {
    /// CollisionOracle is not available in the environment.
    #[error("CollisionOracle not available")]
    CollisionNotAvailable,

    /// PathOracle is not available in the environment.
    #[error("PathOracle not available")]
    PathsNotAvailable,

    /// SessionOracle is not available in the environment.
    #[error("SessionOracle not available")]
    SessionsNotAvailable,

    /// WallClock is not available in the environment.
    #[error("WallClock not available")]
    ClockNotAvailable,
}

impl SimError for OracleError {
    fn severity(&self) -> ErrorSeverity {
        // Scenes run without some services; each caller decides how to degrade.
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        use OracleError::*;
        match self {
            CollisionNotAvailable => "ORACLE_COLLISION_NOT_AVAILABLE",
            PathsNotAvailable => "ORACLE_PATHS_NOT_AVAILABLE",
            SessionsNotAvailable => "ORACLE_SESSIONS_NOT_AVAILABLE",
            ClockNotAvailable => "ORACLE_CLOCK_NOT_AVAILABLE",
        }
    }
}
