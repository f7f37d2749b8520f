//! Actions that mutate resolved actors. Each helper reports whether at least
//! one target was affected; entries and unknown keys are skipped.

use tracing::{trace, warn};

use crate::env::ClientAction;
use crate::geom::Transform;
use crate::logic::LogicContext;
use crate::state::EntityKey;

pub(super) fn destroy(ctx: &mut LogicContext<'_>, keys: &[EntityKey], end_scene: bool) -> bool {
    let mut destroyed = false;
    for id in keys.iter().filter_map(|key| key.actor()) {
        match ctx.scene.destroy_actor(id, end_scene) {
            Ok(newly) => destroyed |= newly,
            Err(error) => trace!(target: "sim::action", %id, %error, "Skipped destroy"),
        }
    }
    destroyed
}

pub(super) fn rotate(ctx: &mut LogicContext<'_>, keys: &[EntityKey], delta: f32) -> bool {
    let mut rotated = false;
    for id in keys.iter().filter_map(|key| key.actor()) {
        rotated |= ctx.scene.rotate_actor(id, delta).is_ok();
    }
    rotated
}

pub(super) fn warp(ctx: &mut LogicContext<'_>, keys: &[EntityKey], destination: Transform) -> bool {
    let mut warped = false;
    for id in keys.iter().filter_map(|key| key.actor()) {
        match ctx.scene.warp_actor(id, destination) {
            Ok(()) => warped = true,
            Err(error) => trace!(target: "sim::action", %id, %error, "Skipped warp"),
        }
    }
    warped
}

pub(super) fn set_flag(ctx: &mut LogicContext<'_>, keys: &[EntityKey], flag: &str, value: bool) -> bool {
    let mut applied = false;
    for key in keys {
        let Some(id) = key.actor() else {
            trace!(target: "sim::action", %key, "Flags only exist on actors");
            continue;
        };
        match ctx.scene.set_flag(id, flag, value) {
            Ok(()) => applied = true,
            Err(error) => warn!(target: "sim::action", %error, "Failed to set flag"),
        }
    }
    applied
}

pub(super) fn force_client_action(
    ctx: &mut LogicContext<'_>,
    keys: &[EntityKey],
    action: &ClientAction,
) -> bool {
    let mut posted = false;
    for key in keys {
        match ctx.scene.force_client_action(*key, action) {
            Ok(()) => posted = true,
            Err(error) => trace!(target: "sim::action", %error, "Skipped client action"),
        }
    }
    posted
}

pub(super) fn move_body(
    ctx: &mut LogicContext<'_>,
    keys: &[EntityKey],
    scene: &str,
    portal: Option<&str>,
) -> bool {
    let mut moved = false;
    for key in keys {
        match ctx.scene.move_body(*key, scene, portal) {
            Ok(()) => moved = true,
            Err(error) => trace!(target: "sim::action", %error, "Skipped body move"),
        }
    }
    moved
}
