//! Deterministic physical advancement of mobile actors.
//!
//! The scene owns one [`Advancer`] per mobile actor and plays the role of its
//! environment: the advancer integrates the [`Body`] in fixed sub-steps and
//! asks the [`AdvanceEnv`] for penetrations after every step.

use std::fmt;

use crate::geom::{Shape, Transform, Vector2, angle_difference, normalize_angle};
use crate::schema::ShapeConfig;
use crate::state::{CollisionFlags, Timestamp};

/// Collision feedback available to an advancer.
pub trait AdvanceEnv {
    /// Vector that pushes `shape` out of whatever blocks it under `mask`.
    fn penetration(&self, mask: CollisionFlags, shape: &Shape) -> Option<Vector2>;
}

/// Movement state an advancer integrates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub transform: Transform,
    pub shape: ShapeConfig,
    pub mask: CollisionFlags,
    /// Heading of travel in radians.
    pub direction: f32,
    /// Units per second.
    pub speed: f32,
    pub moving: bool,
    pub target_rotation: Option<f32>,
    /// Radians per second; 0 turns instantly.
    pub turn_rate: f32,
}

pub trait Advancer: fmt::Debug + Send {
    /// Time the body has been integrated up to.
    fn timestamp(&self) -> Timestamp;

    /// Integrates `body` up to `timestamp`, appending every penetration
    /// resolved on the way.
    fn advance(
        &mut self,
        body: &mut Body,
        env: &dyn AdvanceEnv,
        timestamp: Timestamp,
        penetrations: &mut Vec<Vector2>,
    );

    /// Moves the clock to `timestamp` without integrating.
    fn jump(&mut self, timestamp: Timestamp);
}

/// Straight-line motion with turn-rate-limited rotation.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearAdvancer {
    timestamp: Timestamp,
    sub_step: i64,
}

impl LinearAdvancer {
    pub fn new(timestamp: Timestamp, sub_step: i64) -> Self {
        Self {
            timestamp,
            sub_step: sub_step.max(1),
        }
    }

    fn integrate(body: &mut Body, env: &dyn AdvanceEnv, millis: i64, penetrations: &mut Vec<Vector2>) {
        let seconds = millis as f32 / 1000.0;

        if let Some(target) = body.target_rotation {
            let remaining = angle_difference(body.transform.rotation, target);
            if body.turn_rate <= 0.0 {
                body.transform.rotation = normalize_angle(target);
            } else {
                let step = body.turn_rate * seconds;
                body.transform.rotation =
                    normalize_angle(body.transform.rotation + remaining.clamp(-step, step));
            }
        }

        if body.moving && body.speed > 0.0 {
            body.transform.translation += Vector2::from_angle(body.direction) * (body.speed * seconds);
        }

        if body.mask.is_empty() {
            return;
        }
        let shape = body.shape.at(&body.transform);
        if let Some(push) = env.penetration(body.mask, &shape) {
            body.transform.translation += push;
            penetrations.push(push);
        }
    }
}

impl Advancer for LinearAdvancer {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn advance(
        &mut self,
        body: &mut Body,
        env: &dyn AdvanceEnv,
        timestamp: Timestamp,
        penetrations: &mut Vec<Vector2>,
    ) {
        while self.timestamp < timestamp {
            let millis = (timestamp - self.timestamp).min(self.sub_step);
            Self::integrate(body, env, millis, penetrations);
            self.timestamp = self.timestamp + millis;
        }
    }

    fn jump(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }
}
