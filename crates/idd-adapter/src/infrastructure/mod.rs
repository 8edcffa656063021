//! Infrastructure layer for the indirect display adapter.
//!
//! Contains the concrete collaborators the application layer talks to
//! through traits.
//!
//! **Dependency rule**: this layer may depend on `application` and `idd_core`,
//! but MUST NOT be imported by the `application` layer outside of tests.
//!
//! # Sub-modules
//!
//! - **`host`** – `SimulatedHost`, an in-process implementation of
//!   `HostRuntime` that hands out handles, records every call, and can be told
//!   to fail any step.  Drives the simulator binary and the scenario tests.
//!
//! - **`renderer`** – `FrameRenderer` sinks: `ChannelRenderer` forwards events
//!   over a tokio channel to an async consumer; `mock::RecordingRenderer`
//!   records them for assertions.
//!
//! - **`storage`** – TOML configuration loaded from the platform config
//!   directory.

pub mod host;
pub mod renderer;
pub mod storage;
