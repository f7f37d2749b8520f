use super::{ActionConfig, ConditionConfig, TargetConfig};

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
pub enum TurnPolicy {
    #[default]
    Reverse,
    Left,
    Right,
    Random,
}

/// Timing shared by the wander family.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WanderConfig {
    /// Milliseconds between direction changes.
    pub interval: i64,
    pub variance: i64,
    /// Largest random turn, in radians.
    pub directional_change: f32,
    /// Distance from the origin beyond which the agent turns back; 0 is unbounded.
    pub radius: f32,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            interval: 2_000,
            variance: 500,
            directional_change: std::f32::consts::FRAC_PI_2,
            radius: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightedBehavior {
    pub weight: f32,
    pub behavior: BehaviorConfig,
}

/// Autonomous agent decision logic.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BehaviorConfig {
    #[default]
    Idle,
    Wander(WanderConfig),
    /// Wander timing; collisions run `action` instead of reflecting.
    WanderCollision {
        #[cfg_attr(feature = "serde", serde(default))]
        wander: WanderConfig,
        action: ActionConfig,
    },
    /// Wander restricted to the four cardinal directions.
    GridWander {
        #[cfg_attr(feature = "serde", serde(default))]
        wander: WanderConfig,
        #[cfg_attr(feature = "serde", serde(default))]
        policy: TurnPolicy,
    },
    /// Follows the path of the first resolved entry.
    Patrol {
        target: TargetConfig,
        /// Distance within which another path's node may be taken at a
        /// waypoint; negative never reroutes.
        #[cfg_attr(feature = "serde", serde(default = "never_branch"))]
        branch_radius: f32,
    },
    /// Keeps the nearest resolved target between `minimum` and `maximum`.
    Follow {
        target: TargetConfig,
        #[cfg_attr(feature = "serde", serde(default))]
        minimum: f32,
        maximum: f32,
        /// Milliseconds between path recomputations.
        #[cfg_attr(feature = "serde", serde(default = "follow_interval"))]
        interval: i64,
    },
    /// Reselects a weighted sub-behavior every `interval` milliseconds.
    Random {
        interval: i64,
        behaviors: Vec<WeightedBehavior>,
    },
    Scripted {
        steps: Vec<StepConfig>,
    },
    Combined {
        first: Box<BehaviorConfig>,
        second: Box<BehaviorConfig>,
    },
}

#[cfg(feature = "serde")]
fn never_branch() -> f32 {
    -1.0
}

#[cfg(feature = "serde")]
fn follow_interval() -> i64 {
    500
}

/// One step of a scripted behavior.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepConfig {
    Wait {
        duration: i64,
    },
    /// Walks to the first resolved target's position as it was when the step began.
    Move {
        target: TargetConfig,
    },
    Rotate {
        rotation: f32,
        #[cfg_attr(feature = "serde", serde(default))]
        relative: bool,
    },
    /// Waits until `condition` holds or `timeout` elapses (0 waits forever),
    /// then jumps to `success` or `failure`; `None` continues with the next step.
    Condition {
        condition: ConditionConfig,
        #[cfg_attr(feature = "serde", serde(default))]
        timeout: i64,
        #[cfg_attr(feature = "serde", serde(default))]
        success: Option<usize>,
        #[cfg_attr(feature = "serde", serde(default))]
        failure: Option<usize>,
    },
    /// Immediate branch on `condition`.
    Branch {
        condition: ConditionConfig,
        #[cfg_attr(feature = "serde", serde(default))]
        success: Option<usize>,
        #[cfg_attr(feature = "serde", serde(default))]
        failure: Option<usize>,
    },
    Goto {
        step: usize,
    },
    Action(ActionConfig),
    SetSpeed {
        speed: f32,
    },
    ClearSpeed,
}
