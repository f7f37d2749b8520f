use crate::geom::{Shape, Vector2};
use crate::logic::HandlerLogic;
use crate::schema::EntryConfig;
use crate::state::{EntryId, LogicBase};

/// Static logic object placed in the scene: an area, a marker or a patrol path.
#[derive(Debug)]
pub struct Entry {
    pub base: LogicBase,
    name: String,
    shape: Shape,
    path: Vec<Vector2>,
    pub(crate) handlers: Vec<Option<HandlerLogic>>,
}

impl Entry {
    pub(crate) fn new(id: EntryId, config: &EntryConfig) -> Self {
        let mut base = LogicBase::new(id.into(), config.transform, config.tags.iter().cloned());
        for (name, value) in &config.variables {
            base.set_variable(name, value.clone());
        }
        Self {
            base,
            name: config.name.clone(),
            shape: config.shape.at(&config.transform),
            path: config.path.clone(),
            handlers: config
                .handlers
                .iter()
                .map(|handler| Some(HandlerLogic::new(handler)))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Patrol waypoints; empty when the entry is not a path.
    pub fn path(&self) -> &[Vector2] {
        &self.path
    }
}
