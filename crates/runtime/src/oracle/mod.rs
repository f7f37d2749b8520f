//! Runtime implementations of the scene's oracle traits.
//!
//! The scene reaches client sessions through [`sim_core::SessionOracle`]; the
//! runtime answers by publishing [`crate::events::SessionEvent`]s so the
//! transport layer can forward them without the simulation waiting on I/O.
mod sessions;

pub use sessions::ChannelSessionOracle;
