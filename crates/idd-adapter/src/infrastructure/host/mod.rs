//! Host runtime implementations.
//!
//! Only a simulated host lives here: the real host runtime is an external
//! collaborator reached through the `HostRuntime` trait.

pub mod simulated;

pub use simulated::{HostCall, HostStep, SimulatedHost};
