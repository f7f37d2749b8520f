use super::{ConditionConfig, ExpressionConfig, TargetConfig};
use crate::env::ClientAction;
use crate::geom::Transform;
use crate::state::{CollisionFlags, Value};

/// Level for [`ActionConfig::ServerLog`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwitchCase {
    pub condition: ConditionConfig,
    pub action: ActionConfig,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpressionCase {
    pub value: Value,
    pub action: ActionConfig,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightedAction {
    pub weight: f32,
    pub action: ActionConfig,
}

/// Declarative command tree.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionConfig {
    /// Spawns at each location with `rotation ± variance`, optionally added
    /// to the location's own facing.
    SpawnActor {
        actor: String,
        #[cfg_attr(feature = "serde", serde(default))]
        location: TargetConfig,
        #[cfg_attr(feature = "serde", serde(default))]
        rotation: f32,
        #[cfg_attr(feature = "serde", serde(default))]
        variance: f32,
        #[cfg_attr(feature = "serde", serde(default))]
        relative: bool,
    },
    /// Spawns at `transform` composed into each location's frame.
    SpawnTransformedActor {
        actor: String,
        #[cfg_attr(feature = "serde", serde(default))]
        location: TargetConfig,
        transform: Transform,
    },
    /// Spawns at each location, rotated to face the first `facing` entity.
    SpawnFacingActor {
        actor: String,
        #[cfg_attr(feature = "serde", serde(default))]
        location: TargetConfig,
        facing: TargetConfig,
    },
    /// Up to `count` spawns at random grid offsets around the first location.
    SpawnRandomTranslatedActor {
        actor: String,
        #[cfg_attr(feature = "serde", serde(default))]
        location: TargetConfig,
        count: u32,
        /// Grid spacing.
        step: f32,
        /// Offsets range over `-range..=range` steps on each axis.
        range: i32,
        /// Non-empty requires a clear straight line from the location.
        #[cfg_attr(feature = "serde", serde(default))]
        collision_mask: CollisionFlags,
    },
    DestroyActor {
        #[cfg_attr(feature = "serde", serde(default))]
        target: TargetConfig,
        #[cfg_attr(feature = "serde", serde(default))]
        end_scene: bool,
    },
    /// Adds `rotation`, or the numeric variable `variable` on the source when set.
    RotateActor {
        #[cfg_attr(feature = "serde", serde(default))]
        target: TargetConfig,
        #[cfg_attr(feature = "serde", serde(default))]
        rotation: f32,
        #[cfg_attr(feature = "serde", serde(default))]
        variable: Option<String>,
    },
    WarpActor {
        #[cfg_attr(feature = "serde", serde(default))]
        target: TargetConfig,
        location: TargetConfig,
    },
    WarpTransformedActor {
        #[cfg_attr(feature = "serde", serde(default))]
        target: TargetConfig,
        location: TargetConfig,
        transform: Transform,
    },
    FireEffect {
        effect: String,
        #[cfg_attr(feature = "serde", serde(default))]
        location: TargetConfig,
    },
    Signal {
        #[cfg_attr(feature = "serde", serde(default))]
        target: TargetConfig,
        name: String,
    },
    MoveBody {
        #[cfg_attr(feature = "serde", serde(default))]
        target: TargetConfig,
        scene: String,
        #[cfg_attr(feature = "serde", serde(default))]
        portal: Option<String>,
    },
    MoveAll {
        scene: String,
        #[cfg_attr(feature = "serde", serde(default))]
        portal: Option<String>,
    },
    Conditional {
        condition: ConditionConfig,
        action: Box<ActionConfig>,
        #[cfg_attr(feature = "serde", serde(default))]
        otherwise: Option<Box<ActionConfig>>,
    },
    Switch {
        cases: Vec<SwitchCase>,
        #[cfg_attr(feature = "serde", serde(default))]
        default: Option<Box<ActionConfig>>,
    },
    ExpressionSwitch {
        expression: ExpressionConfig,
        cases: Vec<ExpressionCase>,
        #[cfg_attr(feature = "serde", serde(default))]
        default: Option<Box<ActionConfig>>,
    },
    Compound {
        actions: Vec<ActionConfig>,
        #[cfg_attr(feature = "serde", serde(default))]
        stop_on_failure: bool,
    },
    Random {
        actions: Vec<WeightedAction>,
    },
    /// Runs `action` once, `delay ± variance` milliseconds later.
    Delayed {
        action: Box<ActionConfig>,
        delay: i64,
        #[cfg_attr(feature = "serde", serde(default))]
        variance: i64,
    },
    SetVariable {
        #[cfg_attr(feature = "serde", serde(default))]
        target: TargetConfig,
        name: String,
        value: ExpressionConfig,
    },
    SetFlag {
        #[cfg_attr(feature = "serde", serde(default))]
        target: TargetConfig,
        flag: String,
        value: bool,
    },
    ForceClientAction {
        #[cfg_attr(feature = "serde", serde(default))]
        target: TargetConfig,
        action: ClientAction,
    },
    /// Runs `action` once per resolved target, with that target as activator.
    Targeted {
        target: TargetConfig,
        action: Box<ActionConfig>,
    },
    ServerLog {
        #[cfg_attr(feature = "serde", serde(default))]
        level: LogLevel,
        message: String,
    },
    /// Runs the wrapped action for effect and always fails.
    Fail(Box<ActionConfig>),
}

impl ActionConfig {
    pub fn spawn(actor: impl Into<String>, location: TargetConfig) -> Self {
        ActionConfig::SpawnActor {
            actor: actor.into(),
            location,
            rotation: 0.0,
            variance: 0.0,
            relative: false,
        }
    }

    pub fn set_variable(name: impl Into<String>, value: ExpressionConfig) -> Self {
        ActionConfig::SetVariable {
            target: TargetConfig::Source,
            name: name.into(),
            value,
        }
    }

    pub fn log(message: impl Into<String>) -> Self {
        ActionConfig::ServerLog {
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    pub fn fail(action: ActionConfig) -> Self {
        ActionConfig::Fail(Box::new(action))
    }

    pub fn delayed(action: ActionConfig, delay: i64, variance: i64) -> Self {
        ActionConfig::Delayed {
            action: Box::new(action),
            delay,
            variance,
        }
    }
}
