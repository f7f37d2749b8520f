//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, scene calls, and content loading
//! so clients can bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use sim_core::{ErrorSeverity, SceneError, SessionId, SimError};

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("simulation worker command channel closed")]
    CommandChannelClosed,

    #[error("simulation worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("simulation worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Content(#[from] anyhow::Error),

    #[error("runtime requires a scene source before building")]
    MissingScene,

    #[error("{0} has no body in this scene")]
    UnknownSession(SessionId),

    #[error("{0} already has a body in this scene")]
    SessionOccupied(SessionId),
}

impl SimError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            RuntimeError::Scene(error) => error.severity(),
            RuntimeError::UnknownSession(_) | RuntimeError::SessionOccupied(_) => {
                ErrorSeverity::Validation
            }
            RuntimeError::Content(_) | RuntimeError::MissingScene => ErrorSeverity::Fatal,
            RuntimeError::CommandChannelClosed
            | RuntimeError::ReplyChannelClosed(_)
            | RuntimeError::WorkerJoin(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            RuntimeError::CommandChannelClosed => "RUNTIME_COMMAND_CHANNEL_CLOSED",
            RuntimeError::ReplyChannelClosed(_) => "RUNTIME_REPLY_CHANNEL_CLOSED",
            RuntimeError::WorkerJoin(_) => "RUNTIME_WORKER_JOIN",
            RuntimeError::Scene(error) => error.error_code(),
            RuntimeError::Content(_) => "RUNTIME_CONTENT",
            RuntimeError::MissingScene => "RUNTIME_MISSING_SCENE",
            RuntimeError::UnknownSession(_) => "RUNTIME_UNKNOWN_SESSION",
            RuntimeError::SessionOccupied(_) => "RUNTIME_SESSION_OCCUPIED",
        }
    }
}
