//! Actor spawning actions.

use rand::Rng;
use tracing::{trace, warn};

use crate::geom::{Transform, Vector2};
use crate::logic::{IntervalId, LogicContext, LogicNode, TargetLogic, TransferContext};
use crate::scene::SpawnOrigin;
use crate::schema::TargetConfig;
use crate::state::{CollisionFlags, EntityKey};

/// Attempts per random placement before giving up on it.
const PLACEMENT_ATTEMPTS: usize = 3;

/// How the spawn transform is derived from each location.
#[derive(Debug)]
pub enum Placement {
    /// `rotation ± variance`, optionally added to the location's facing.
    Fixed {
        rotation: f32,
        variance: f32,
        relative: bool,
    },
    /// Local transform composed into the location's frame.
    Transformed(Transform),
    /// Rotated to face the first resolved entity.
    Facing(TargetLogic),
    /// Random grid offsets around the first location.
    RandomTranslated {
        count: u32,
        step: f32,
        range: i32,
        collision_mask: CollisionFlags,
    },
}

#[derive(Debug)]
pub struct SpawnLogic {
    actor: String,
    location: TargetLogic,
    placement: Placement,
}

impl SpawnLogic {
    pub fn new(actor: &str, location: &TargetConfig, placement: Placement) -> Self {
        Self {
            actor: actor.to_owned(),
            location: TargetLogic::new(location),
            placement,
        }
    }

    /// Succeeds when at least one actor was spawned.
    pub(super) fn execute(&mut self, ctx: &mut LogicContext<'_>, activator: Option<EntityKey>) -> bool {
        let origin = SpawnOrigin {
            source: Some(ctx.source),
            activator,
        };
        let locations: Vec<Transform> = self
            .location
            .resolve_all(ctx, activator)
            .into_iter()
            .filter_map(|key| ctx.scene.logic(key).map(|logic| logic.transform))
            .collect();
        if locations.is_empty() {
            trace!(target: "sim::action", actor = %self.actor, "Spawn without a location");
            return false;
        }

        let mut spawned = false;
        match &mut self.placement {
            Placement::Fixed {
                rotation,
                variance,
                relative,
            } => {
                for location in locations {
                    let mut angle = *rotation;
                    if *variance > 0.0 {
                        angle += ctx.scene.rng().gen_range(-*variance..=*variance);
                    }
                    if *relative {
                        angle += location.rotation;
                    }
                    let transform = Transform::new(location.translation, angle);
                    spawned |= spawn(ctx, &self.actor, transform, origin);
                }
            }
            Placement::Transformed(local) => {
                for location in locations {
                    spawned |= spawn(ctx, &self.actor, location.compose(local), origin);
                }
            }
            Placement::Facing(facing) => {
                let facing = facing
                    .resolve_first(ctx, activator)
                    .and_then(|key| ctx.scene.logic(key))
                    .map(|logic| logic.transform.translation);
                for location in locations {
                    let rotation = match facing {
                        Some(point) => location.translation.direction_to(point),
                        None => location.rotation,
                    };
                    let transform = Transform::new(location.translation, rotation);
                    spawned |= spawn(ctx, &self.actor, transform, origin);
                }
            }
            Placement::RandomTranslated {
                count,
                step,
                range,
                collision_mask,
            } => {
                let center = locations[0];
                let mut used: Vec<(i32, i32)> = Vec::new();
                for _ in 0..*count {
                    for _ in 0..PLACEMENT_ATTEMPTS {
                        let offset = {
                            let rng = ctx.scene.rng();
                            (rng.gen_range(-*range..=*range), rng.gen_range(-*range..=*range))
                        };
                        if used.contains(&offset) {
                            continue;
                        }
                        used.push(offset);
                        let point = center.translation
                            + Vector2::new(offset.0 as f32 * *step, offset.1 as f32 * *step);
                        if !collision_mask.is_empty()
                            && !ctx.scene.line_clear(*collision_mask, center.translation, point)
                        {
                            continue;
                        }
                        let transform = Transform::new(point, center.rotation);
                        spawned |= spawn(ctx, &self.actor, transform, origin);
                        break;
                    }
                }
            }
        }
        spawned
    }
}

fn spawn(ctx: &mut LogicContext<'_>, actor: &str, transform: Transform, origin: SpawnOrigin) -> bool {
    match ctx.scene.spawn_actor(actor, transform, origin) {
        Ok(_) => true,
        Err(error) => {
            warn!(target: "sim::action", %actor, %error, "Failed to spawn actor");
            false
        }
    }
}

impl LogicNode for SpawnLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        if self.location.fire_interval(ctx, id) {
            return true;
        }
        match &mut self.placement {
            Placement::Facing(facing) => facing.fire_interval(ctx, id),
            _ => false,
        }
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        self.location.collect_intervals(out);
        if let Placement::Facing(facing) = &self.placement {
            facing.collect_intervals(out);
        }
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        self.location.transfer(&source.location, tx);
        if let (Placement::Facing(facing), Placement::Facing(from)) =
            (&mut self.placement, &source.placement)
        {
            facing.transfer(from, tx);
        }
    }
}
