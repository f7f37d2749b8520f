//! Errors returned by the public [`Scene`](super::Scene) API.

use crate::error::{ErrorSeverity, SimError};
use crate::state::{ActorId, EntityKey, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("no actor config named '{0}'")]
    UnknownConfig(String),

    #[error("{0} does not exist")]
    UnknownActor(ActorId),

    #[error("{0} does not exist")]
    UnknownEntity(EntityKey),

    #[error("{0} is already destroyed")]
    Destroyed(ActorId),

    #[error("{0} is not a pawn")]
    NotPawn(ActorId),

    #[error("scene is not running")]
    NotRunning,

    #[error("scene has already been started")]
    AlreadyStarted,

    #[error("cannot tick back to {requested} from {now}")]
    ClockReversed { now: Timestamp, requested: Timestamp },

    #[error("cannot transfer scene '{source_scene}' into '{destination}'")]
    SceneMismatch {
        source_scene: String,
        destination: String,
    },
}

impl SimError for SceneError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            SceneError::UnknownActor(_)
            | SceneError::UnknownEntity(_)
            | SceneError::Destroyed(_)
            | SceneError::NotRunning => ErrorSeverity::Recoverable,
            SceneError::UnknownConfig(_)
            | SceneError::NotPawn(_)
            | SceneError::SceneMismatch { .. } => ErrorSeverity::Validation,
            SceneError::AlreadyStarted | SceneError::ClockReversed { .. } => {
                ErrorSeverity::Internal
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SceneError::UnknownConfig(_) => "SCENE_UNKNOWN_CONFIG",
            SceneError::UnknownActor(_) => "SCENE_UNKNOWN_ACTOR",
            SceneError::UnknownEntity(_) => "SCENE_UNKNOWN_ENTITY",
            SceneError::Destroyed(_) => "SCENE_DESTROYED",
            SceneError::NotPawn(_) => "SCENE_NOT_PAWN",
            SceneError::NotRunning => "SCENE_NOT_RUNNING",
            SceneError::AlreadyStarted => "SCENE_ALREADY_STARTED",
            SceneError::ClockReversed { .. } => "SCENE_CLOCK_REVERSED",
            SceneError::SceneMismatch { .. } => "SCENE_MISMATCH",
        }
    }
}
