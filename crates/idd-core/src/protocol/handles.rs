//! Typed opaque handles and the monitor identifier allocator.
//!
//! # Why newtypes for handles? (for beginners)
//!
//! The host runtime hands the driver many different kinds of tokens: a
//! device-init handle, a device object, a monitor object, a swap chain.  At
//! the machine level they are all just integers or pointers, which makes it
//! easy to pass the wrong one to the wrong call.  Wrapping each kind in its
//! own tuple struct lets the compiler catch those mix-ups for free.
//!
//! The driver never looks inside these tokens.  It stores them, compares
//! them, and passes them back to the host or the renderer.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known identifier under which the virtual adapter's device interface
/// is published so other system components can discover it.
pub const GUID_DEVINTERFACE_INDIRECT_DEVICE: Uuid =
    Uuid::from_u128(0x4b9c_2a6e_1d3f_4c58_9e07_b2f1_6a8d_53c1);

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }
    };
}

opaque_handle!(
    /// Token for the device-init structure passed with a device-add event.
    DeviceInitHandle
);
opaque_handle!(
    /// Token for the host device object created during device-add.
    DeviceHandle
);
opaque_handle!(
    /// Token for the host-side monitor object.
    HostMonitorHandle
);
opaque_handle!(
    /// Token for a host-provided swap chain (buffer-exchange channel).
    SwapChainHandle
);
opaque_handle!(
    /// Token for one frame buffer acquired from a swap chain.
    FrameToken
);

/// Driver-assigned monitor identifier.
///
/// Assigned monotonically by [`MonitorIdAllocator`]; never reused within one
/// adapter's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonitorId(pub u32);

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "monitor-{}", self.0)
    }
}

/// A thread-safe, monotonically increasing source of [`MonitorId`]s.
///
/// Monitor arrivals for the same adapter may be processed on different host
/// worker threads, so the counter is an `AtomicU32`: two threads calling
/// [`next`](Self::next) at the same time always get distinct ids.
///
/// # Examples
///
/// ```rust
/// use idd_core::MonitorIdAllocator;
///
/// let ids = MonitorIdAllocator::new();
/// assert_eq!(ids.next().0, 1);
/// assert_eq!(ids.next().0, 2);
/// ```
pub struct MonitorIdAllocator {
    next: AtomicU32,
}

impl MonitorIdAllocator {
    /// Creates an allocator whose first id is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
        }
    }

    /// Returns the next identifier.
    ///
    /// `Relaxed` is enough: the id only has to be unique, it does not
    /// publish any other memory.
    pub fn next(&self) -> MonitorId {
        MonitorId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of identifiers handed out so far.
    pub fn issued(&self) -> u32 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

impl Default for MonitorIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
