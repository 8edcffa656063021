//! idd-adapter library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the simulator binary in `main.rs` share the same module tree.
//!
//! # What does idd-adapter do? (for beginners)
//!
//! The host display runtime drives an indirect display driver entirely
//! through callbacks.  This crate is the driver's side of that conversation:
//!
//! 1. On *device add* it negotiates the protocol version, registers its
//!    callbacks, creates the device object and publishes a device interface.
//! 2. On *power on* it asks the host to initialise the display adapter, and
//!    once the host reports that initialisation finished it plugs in the
//!    configured virtual monitors.
//! 3. For each monitor it answers mode queries and validates mode commits.
//! 4. When the host assigns a swap chain to a monitor it tells the renderer
//!    to start consuming frames; when the swap chain is unassigned (or the
//!    monitor departs) it releases every in-flight frame and tells the
//!    renderer to stop.
//! 5. On *cleanup* it tears every monitor down exactly once.

/// Application layer: the lifecycle components and the callback table.
pub mod application;

/// Infrastructure layer: simulated host, renderer sinks, configuration storage.
pub mod infrastructure;
