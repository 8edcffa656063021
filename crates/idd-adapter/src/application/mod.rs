//! Application layer for the indirect display adapter.
//!
//! # Which component lives where?
//!
//! - **`negotiate_version`** – queries the host protocol version and turns it
//!   into the adapter's read-only `CapabilitySet`.
//!
//! - **`adapter`** – `AdapterContext`: the device-add sequence, the adapter
//!   state machine, monitor hot-plug, and the one-shot cleanup.  Also defines
//!   the `HostRuntime` trait through which the driver calls the host.
//!
//! - **`monitor`** – `MonitorContext`: one virtual monitor's modes, committed
//!   mode, and active swap chain, all behind a per-monitor lock.
//!
//! - **`negotiate_modes`** – `ModeNegotiationEngine`: default modes from a
//!   monitor description, target-mode queries, and atomic mode commits.
//!
//! - **`swap_chain`** – `SwapChainManager`: swap-chain assign/unassign, frame
//!   forwarding to the `FrameRenderer`, and the version-gated physical-size
//!   query.
//!
//! - **`io_control`** – decoding of the optional IO-control requests.
//!
//! - **`dispatch`** – the `IndirectDisplayCallbacks` trait (one method per
//!   host event), the `CallbackTable` registered with the host, and the
//!   `IndirectDisplayDriver` that routes each callback to the components
//!   above and maps their errors to host status codes.

pub mod adapter;
pub mod dispatch;
pub mod io_control;
pub mod monitor;
pub mod negotiate_modes;
pub mod negotiate_version;
pub mod swap_chain;
