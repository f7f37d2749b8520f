use std::fmt;

use crate::state::Value;

/// Identifier of a connected client session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Client-directed command posted to a pawn's controlling session.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientAction {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub argument: Value,
}

/// Client session registry.
///
/// Calls are fire-and-forget; the simulation never waits on a session.
pub trait SessionOracle: Send + Sync {
    /// Moves the session's body to another scene, optionally at a named portal.
    fn move_body(&self, session: SessionId, scene: &str, portal: Option<&str>);

    fn force_client_action(&self, session: SessionId, action: &ClientAction);
}
