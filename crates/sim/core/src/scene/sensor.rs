//! Intersection sensors attached to handlers.

use std::collections::{BTreeMap, BTreeSet};

use super::index::ShapeObserver;
use crate::geom::{Shape, Transform};
use crate::logic::HandlerKey;
use crate::schema::SensorConfig;
use crate::state::{ActorId, CollisionFlags, EntityKey};

#[derive(Clone, Debug, PartialEq)]
pub struct Sensor {
    pub config: SensorConfig,
    pub shape: Shape,
    /// Matching actors inside at the end of the previous tick.
    pub inside: BTreeSet<ActorId>,
    /// Actors that already triggered the sensor this tick.
    pub touched: BTreeSet<ActorId>,
}

impl Sensor {
    fn placed(config: &SensorConfig, owner_shape: &Shape, transform: &Transform) -> Shape {
        match &config.shape {
            Some(shape) => shape.at(transform),
            None => *owner_shape,
        }
    }

    /// Whether an actor other than the owner with `flags` and `shape` is inside.
    pub fn detects(&self, flags: CollisionFlags, shape: &Shape) -> bool {
        self.config.matches(flags) && self.shape.intersects(shape)
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct SensorIndex {
    sensors: BTreeMap<HandlerKey, Sensor>,
}

impl SensorIndex {
    pub fn register(&mut self, key: HandlerKey, config: &SensorConfig, owner_shape: &Shape, transform: &Transform) {
        let sensor = Sensor {
            config: config.clone(),
            shape: Sensor::placed(config, owner_shape, transform),
            inside: BTreeSet::new(),
            touched: BTreeSet::new(),
        };
        self.sensors.insert(key, sensor);
    }

    pub fn unregister_entity(&mut self, entity: EntityKey) {
        self.sensors.retain(|key, _| key.entity != entity);
    }

    pub fn get(&self, key: HandlerKey) -> Option<&Sensor> {
        self.sensors.get(&key)
    }

    pub fn get_mut(&mut self, key: HandlerKey) -> Option<&mut Sensor> {
        self.sensors.get_mut(&key)
    }

    pub fn keys(&self) -> Vec<HandlerKey> {
        self.sensors.keys().copied().collect()
    }

    /// Sensors that detect `actor`, skipping the actor's own.
    pub fn detecting(&self, actor: ActorId, flags: CollisionFlags, shape: &Shape) -> Vec<HandlerKey> {
        let owner = EntityKey::Actor(actor);
        self.sensors
            .iter()
            .filter(|(key, sensor)| key.entity != owner && sensor.detects(flags, shape))
            .map(|(key, _)| *key)
            .collect()
    }

    fn refresh(&mut self, owner: EntityKey, shape: &Shape, transform: &Transform) {
        for (_, sensor) in self.sensors.iter_mut().filter(|(key, _)| key.entity == owner) {
            sensor.shape = Sensor::placed(&sensor.config, shape, transform);
        }
    }
}

impl ShapeObserver<ActorId> for SensorIndex {
    fn shape_did_change(&mut self, key: ActorId, shape: &Shape, transform: &Transform) {
        self.refresh(EntityKey::Actor(key), shape, transform);
    }
}
