use super::{ActionConfig, ShapeConfig};
use crate::state::CollisionFlags;

/// Sensor volume attached to the handler's owner.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorConfig {
    /// `None` uses the owner's own shape.
    pub shape: Option<ShapeConfig>,
    /// Actor collision categories that trigger the sensor; empty matches all.
    pub mask: CollisionFlags,
}

impl SensorConfig {
    pub fn matches(&self, flags: CollisionFlags) -> bool {
        self.mask.is_empty() || self.mask.intersects(flags)
    }
}

/// Actor filter for population handlers; empty lists match every actor.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PopulationFilter {
    pub configs: Vec<String>,
    pub tags: Vec<String>,
}

/// Action run `lead` milliseconds before a timer expires.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimerWarning {
    pub lead: i64,
    pub action: ActionConfig,
}

/// Event an action is bound to.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HandlerKind {
    Startup,
    /// `end_scene` also runs the handler when the owner goes down with its scene.
    Shutdown {
        #[cfg_attr(feature = "serde", serde(default))]
        end_scene: bool,
    },
    Tick,
    Timer {
        interval: i64,
        #[cfg_attr(feature = "serde", serde(default))]
        offset: i64,
        /// Number of expirations; 0 repeats forever.
        #[cfg_attr(feature = "serde", serde(default))]
        limit: u32,
        #[cfg_attr(feature = "serde", serde(default))]
        warning: Option<Box<TimerWarning>>,
    },
    Signal {
        name: String,
    },
    SignalStart {
        name: String,
    },
    SignalStop {
        name: String,
    },
    Intersection {
        #[cfg_attr(feature = "serde", serde(default))]
        sensor: SensorConfig,
    },
    IntersectionStart {
        #[cfg_attr(feature = "serde", serde(default))]
        sensor: SensorConfig,
    },
    IntersectionStop {
        #[cfg_attr(feature = "serde", serde(default))]
        sensor: SensorConfig,
    },
    /// Runs `action` when the number of intersecting actors reaches
    /// `threshold` and `stop_action` when it drops below again.
    IntersectionCount {
        #[cfg_attr(feature = "serde", serde(default))]
        sensor: SensorConfig,
        threshold: u32,
        #[cfg_attr(feature = "serde", serde(default))]
        stop_action: Option<Box<ActionConfig>>,
    },
    Request {
        name: String,
    },
    ActorAdded {
        #[cfg_attr(feature = "serde", serde(default))]
        filter: PopulationFilter,
    },
    ActorRemoved {
        #[cfg_attr(feature = "serde", serde(default))]
        filter: PopulationFilter,
    },
    OccupantEntered,
    OccupantLeft,
    VariableChanged {
        name: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandlerConfig {
    pub kind: HandlerKind,
    pub action: ActionConfig,
}

impl HandlerConfig {
    pub fn new(kind: HandlerKind, action: ActionConfig) -> Self {
        Self { kind, action }
    }
}
