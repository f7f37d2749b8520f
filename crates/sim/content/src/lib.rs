//! Data-driven scene content and loaders.
//!
//! This crate reads the authoring formats of the simulation:
//! - Actor config catalogs (RON)
//! - Scene layouts: entries and placed actors (RON)
//! - Tile maps for collision and pathfinding (RON)
//! - Simulation tuning (TOML)
//!
//! Every loader deserializes straight into sim-core's configuration schema;
//! [`ContentFactory`] ties them together into a ready [`sim_core::Scene`].

pub mod loaders;

pub use loaders::{ActorLoader, ConfigLoader, ContentFactory, LoadResult, MapLoader, SceneLoader};
