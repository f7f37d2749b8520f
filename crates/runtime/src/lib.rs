//! Async host for one simulated scene.
//!
//! This crate wraps a [`sim_core::Scene`] in a background worker task, drives
//! its tick loop on a tokio interval, and publishes replication, session and
//! lifecycle events. Hosts embed [`Runtime`] and talk to the scene through
//! [`RuntimeHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`oracle`] answers the scene's session requests with events
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod events;
pub mod oracle;
pub mod runtime;

mod workers;

pub use api::{Result, RuntimeError, RuntimeHandle};
pub use events::{Event, EventBus, LifecycleEvent, ReplicationEvent, SessionEvent, Topic};
pub use oracle::ChannelSessionOracle;
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
