use chrono::{DateTime, Utc};

use super::{ActionConfig, ExpressionConfig, RegionConfig, TargetConfig};

/// Logic capability tested by `InstanceOf` conditions and targets.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogicClass {
    /// Any actor.
    Actor,
    /// Mobile, agent or pawn.
    Mobile,
    Agent,
    Pawn,
    /// Scene entry.
    Entry,
}

/// Boolean predicate over targets, regions and time.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConditionConfig {
    Tagged {
        #[cfg_attr(feature = "serde", serde(default))]
        target: TargetConfig,
        tag: String,
        #[cfg_attr(feature = "serde", serde(default))]
        all: bool,
    },
    InstanceOf {
        #[cfg_attr(feature = "serde", serde(default))]
        target: TargetConfig,
        class: LogicClass,
        #[cfg_attr(feature = "serde", serde(default))]
        all: bool,
    },
    Intersecting {
        first: RegionConfig,
        second: RegionConfig,
        #[cfg_attr(feature = "serde", serde(default))]
        all_first: bool,
        #[cfg_attr(feature = "serde", serde(default))]
        all_second: bool,
    },
    /// Euclidean distance between translations within `[minimum, maximum]`.
    DistanceWithin {
        first: TargetConfig,
        second: TargetConfig,
        #[cfg_attr(feature = "serde", serde(default))]
        minimum: f32,
        maximum: f32,
        #[cfg_attr(feature = "serde", serde(default))]
        all_first: bool,
        #[cfg_attr(feature = "serde", serde(default))]
        all_second: bool,
    },
    Random {
        probability: f32,
    },
    /// Satisfied `limit` times, then never again.
    Limit {
        limit: u32,
    },
    /// Satisfied at most once per `period` milliseconds.
    Cooldown {
        period: i64,
    },
    All(Vec<ConditionConfig>),
    Any(Vec<ConditionConfig>),
    FlagSet {
        #[cfg_attr(feature = "serde", serde(default))]
        target: TargetConfig,
        flag: String,
        #[cfg_attr(feature = "serde", serde(default))]
        all: bool,
    },
    Not(Box<ConditionConfig>),
    Always,
    Evaluate(ExpressionConfig),
    /// Runs the action and reports its result.
    Action(Box<ActionConfig>),
    /// Identity comparison between two target sets.
    Is {
        first: TargetConfig,
        second: TargetConfig,
        #[cfg_attr(feature = "serde", serde(default))]
        all: bool,
    },
    /// Wall-clock bounds; `None` leaves that end open.
    DateRange {
        #[cfg_attr(feature = "serde", serde(default))]
        start: Option<DateTime<Utc>>,
        #[cfg_attr(feature = "serde", serde(default))]
        end: Option<DateTime<Utc>>,
    },
}

impl Default for ConditionConfig {
    fn default() -> Self {
        ConditionConfig::Always
    }
}

impl ConditionConfig {
    pub fn not(condition: ConditionConfig) -> Self {
        ConditionConfig::Not(Box::new(condition))
    }

    pub fn evaluate(expression: ExpressionConfig) -> Self {
        ConditionConfig::Evaluate(expression)
    }
}
