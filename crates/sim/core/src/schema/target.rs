use super::{ConditionConfig, LogicClass};
use crate::geom::{Rect, Shape, Transform, Vector2};

/// Local shape, centered on the owner's transform.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShapeConfig {
    #[default]
    Point,
    Circle {
        radius: f32,
    },
    Rect {
        width: f32,
        height: f32,
    },
}

impl ShapeConfig {
    /// Places the shape in `transform`'s frame.
    pub fn at(&self, transform: &Transform) -> Shape {
        let local = match *self {
            ShapeConfig::Point => Shape::Point(Vector2::ZERO),
            ShapeConfig::Circle { radius } => Shape::circle(Vector2::ZERO, radius),
            ShapeConfig::Rect { width, height } => {
                Shape::Rect(Rect::from_center(Vector2::ZERO, width, height))
            }
        };
        local.transformed(transform)
    }
}

/// Declarative selection of logic entities relative to an activator.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetConfig {
    /// The entity owning the executing logic.
    #[default]
    Source,
    Activator,
    /// Activators recorded on the resolved actors.
    ActivatorOf(Box<TargetConfig>),
    Tagged(String),
    InstanceOf(LogicClass),
    Intersecting {
        region: Box<RegionConfig>,
        #[cfg_attr(feature = "serde", serde(default = "enabled"))]
        actors: bool,
        #[cfg_attr(feature = "serde", serde(default))]
        entries: bool,
    },
    RandomSubset {
        target: Box<TargetConfig>,
        size: usize,
    },
    NearestSubset {
        target: Box<TargetConfig>,
        #[cfg_attr(feature = "serde", serde(default))]
        location: Box<TargetConfig>,
        size: usize,
    },
    FarthestSubset {
        target: Box<TargetConfig>,
        #[cfg_attr(feature = "serde", serde(default))]
        location: Box<TargetConfig>,
        size: usize,
    },
    /// Keeps candidates satisfying `condition` evaluated with the candidate as source.
    Conditional {
        target: Box<TargetConfig>,
        condition: Box<ConditionConfig>,
    },
    Compound(Vec<TargetConfig>),
    /// Current targets of the resolved agents' behaviors.
    Behavior(Box<TargetConfig>),
    Excluding {
        target: Box<TargetConfig>,
        excluded: Box<TargetConfig>,
    },
    Randomized(Box<TargetConfig>),
}

#[cfg(feature = "serde")]
fn enabled() -> bool {
    true
}

impl TargetConfig {
    pub fn tagged(tag: impl Into<String>) -> Self {
        TargetConfig::Tagged(tag.into())
    }
}

/// Declarative selection of shapes.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegionConfig {
    /// Each located entity's own shape, optionally grown.
    Default {
        #[cfg_attr(feature = "serde", serde(default))]
        location: TargetConfig,
        #[cfg_attr(feature = "serde", serde(default))]
        expansion: f32,
    },
    /// `shape` placed at `transform` within each located entity's frame.
    Transformed {
        #[cfg_attr(feature = "serde", serde(default))]
        location: TargetConfig,
        shape: ShapeConfig,
        #[cfg_attr(feature = "serde", serde(default))]
        transform: Transform,
    },
    /// World-space shape; ignores the activator.
    Fixed(Shape),
}

impl Default for RegionConfig {
    fn default() -> Self {
        RegionConfig::Default {
            location: TargetConfig::Source,
            expansion: 0.0,
        }
    }
}
