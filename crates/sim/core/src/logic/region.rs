//! Region resolution: declarative locations to world-space shapes.

use super::{IntervalId, LogicContext, LogicNode, TargetLogic, TransferContext};
use crate::geom::{Shape, Transform};
use crate::schema::{RegionConfig, ShapeConfig};
use crate::state::EntityKey;

#[derive(Debug)]
pub enum RegionLogic {
    Default {
        location: TargetLogic,
        expansion: f32,
    },
    Transformed {
        location: TargetLogic,
        shape: ShapeConfig,
        transform: Transform,
    },
    Fixed(Shape),
}

impl RegionLogic {
    pub fn new(config: &RegionConfig) -> Self {
        match config {
            RegionConfig::Default {
                location,
                expansion,
            } => RegionLogic::Default {
                location: TargetLogic::new(location),
                expansion: *expansion,
            },
            RegionConfig::Transformed {
                location,
                shape,
                transform,
            } => RegionLogic::Transformed {
                location: TargetLogic::new(location),
                shape: *shape,
                transform: *transform,
            },
            RegionConfig::Fixed(shape) => RegionLogic::Fixed(*shape),
        }
    }

    /// Appends the resolved shapes to `out`.
    pub fn resolve(
        &mut self,
        ctx: &mut LogicContext<'_>,
        activator: Option<EntityKey>,
        out: &mut Vec<Shape>,
    ) {
        match self {
            RegionLogic::Default {
                location,
                expansion,
            } => {
                for key in location.resolve_all(ctx, activator) {
                    if let Some(shape) = ctx.scene.shape_of(key) {
                        out.push(shape.expanded(*expansion));
                    }
                }
            }
            RegionLogic::Transformed {
                location,
                shape,
                transform,
            } => {
                for key in location.resolve_all(ctx, activator) {
                    if let Some(logic) = ctx.scene.logic(key) {
                        out.push(shape.at(&logic.transform.compose(transform)));
                    }
                }
            }
            RegionLogic::Fixed(shape) => out.push(*shape),
        }
    }

    pub fn resolve_all(&mut self, ctx: &mut LogicContext<'_>, activator: Option<EntityKey>) -> Vec<Shape> {
        let mut out = Vec::new();
        self.resolve(ctx, activator, &mut out);
        out
    }
}

impl LogicNode for RegionLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        match self {
            RegionLogic::Default { location, .. } | RegionLogic::Transformed { location, .. } => {
                location.fire_interval(ctx, id)
            }
            RegionLogic::Fixed(_) => false,
        }
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        match self {
            RegionLogic::Default { location, .. } | RegionLogic::Transformed { location, .. } => {
                location.collect_intervals(out)
            }
            RegionLogic::Fixed(_) => {}
        }
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        match (self, source) {
            (RegionLogic::Default { location, .. }, RegionLogic::Default { location: from, .. })
            | (
                RegionLogic::Transformed { location, .. },
                RegionLogic::Transformed { location: from, .. },
            ) => location.transfer(from, tx),
            _ => {}
        }
    }
}
