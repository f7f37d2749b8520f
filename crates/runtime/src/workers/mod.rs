//! Worker tasks that back the runtime orchestration.
//!
//! The simulation worker owns the scene and executes every command against
//! it, so the scene itself never needs a lock.

mod simulation;

pub use simulation::{Command, SceneQuery, SimulationWorker, WorkerSettings};
