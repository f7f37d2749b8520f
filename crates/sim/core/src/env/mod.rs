//! Oracles for the services the simulation consumes but does not implement.
//!
//! Static collision, pathfinding, client sessions and wall-clock time are
//! reached through traits. The [`SceneEnv`] aggregate bundles them so the scene
//! can access everything it needs without hard coupling to concrete
//! implementations. [`TileMap`] provides collision and grid pathfinding for a
//! tile layout.
mod clock;
mod collision;
mod error;
mod map;
mod path;
mod session;

use std::sync::Arc;

pub use clock::{FixedClock, SystemClock, WallClock};
pub use collision::CollisionOracle;
pub use error::OracleError;
pub use map::TileMap;
pub use path::{PathOracle, PathRequest};
pub use session::{ClientAction, SessionId, SessionOracle};

/// Aggregates the oracles a scene consults while ticking.
///
/// Every oracle is optional; accessors return [`OracleError`] when a service
/// is missing and callers degrade per their own rules.
#[derive(Clone, Default)]
pub struct SceneEnv {
    collision: Option<Arc<dyn CollisionOracle>>,
    paths: Option<Arc<dyn PathOracle>>,
    sessions: Option<Arc<dyn SessionOracle>>,
    clock: Option<Arc<dyn WallClock>>,
}

impl SceneEnv {
    pub fn new(
        collision: Option<Arc<dyn CollisionOracle>>,
        paths: Option<Arc<dyn PathOracle>>,
        sessions: Option<Arc<dyn SessionOracle>>,
        clock: Option<Arc<dyn WallClock>>,
    ) -> Self {
        Self {
            collision,
            paths,
            sessions,
            clock,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Uses one tile map for both collision and pathfinding.
    pub fn with_map(map: Arc<TileMap>) -> Self {
        Self {
            collision: Some(map.clone()),
            paths: Some(map),
            sessions: None,
            clock: Some(Arc::new(SystemClock)),
        }
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionOracle>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn WallClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Returns the CollisionOracle, or an error if not available.
    pub fn collision(&self) -> Result<&dyn CollisionOracle, OracleError> {
        self.collision.as_deref().ok_or(OracleError::CollisionNotAvailable)
    }

    /// Returns the PathOracle, or an error if not available.
    pub fn paths(&self) -> Result<&dyn PathOracle, OracleError> {
        self.paths.as_deref().ok_or(OracleError::PathsNotAvailable)
    }

    /// Returns the SessionOracle, or an error if not available.
    pub fn sessions(&self) -> Result<&dyn SessionOracle, OracleError> {
        self.sessions.as_deref().ok_or(OracleError::SessionsNotAvailable)
    }

    /// Returns the WallClock, or an error if not available.
    pub fn clock(&self) -> Result<&dyn WallClock, OracleError> {
        self.clock.as_deref().ok_or(OracleError::ClockNotAvailable)
    }
}

impl std::fmt::Debug for SceneEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneEnv")
            .field("collision", &self.collision.is_some())
            .field("paths", &self.paths.is_some())
            .field("sessions", &self.sessions.is_some())
            .field("clock", &self.clock.is_some())
            .finish()
    }
}
