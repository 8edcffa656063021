//! MonitorContext: the state of one virtual monitor.
//!
//! A monitor context is created when a monitor arrives and lives until it
//! departs or the adapter is cleaned up.  The identity fields (id, host
//! handle, container id, connector) never change and can be read without
//! locking.  Everything the host can change at runtime sits in
//! [`MonitorState`] behind a single per-monitor mutex, so callbacks for
//! different monitors never contend with each other.

use std::sync::{Mutex, MutexGuard, PoisonError};

use idd_core::{FrameToken, HostMonitorHandle, Mode, ModeList, MonitorId, SwapChainHandle};
use uuid::Uuid;

use super::swap_chain::RenderingParams;

/// The swap chain currently bound to a monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveSwapChain {
    pub(crate) handle: SwapChainHandle,
    pub(crate) params: RenderingParams,
    /// Frames handed to the renderer and not yet released.
    pub(crate) in_flight: Vec<FrameToken>,
    pub(crate) frames_presented: u64,
}

/// Mutable per-monitor state.  Only reachable through [`MonitorContext::lock`].
#[derive(Debug)]
pub(crate) struct MonitorState {
    pub(crate) default_modes: ModeList,
    pub(crate) target_modes: ModeList,
    pub(crate) committed: Option<Mode>,
    pub(crate) swap_chain: Option<ActiveSwapChain>,
    pub(crate) departed: bool,
}

/// One virtual monitor.
#[derive(Debug)]
pub struct MonitorContext {
    id: MonitorId,
    host_handle: HostMonitorHandle,
    connector_index: u32,
    container_id: Uuid,
    physical_size_mm: (u32, u32),
    state: Mutex<MonitorState>,
}

impl MonitorContext {
    pub(crate) fn new(
        id: MonitorId,
        host_handle: HostMonitorHandle,
        connector_index: u32,
        container_id: Uuid,
        physical_size_mm: (u32, u32),
        default_modes: ModeList,
        target_modes: ModeList,
    ) -> Self {
        Self {
            id,
            host_handle,
            connector_index,
            container_id,
            physical_size_mm,
            state: Mutex::new(MonitorState {
                default_modes,
                target_modes,
                committed: None,
                swap_chain: None,
                departed: false,
            }),
        }
    }

    pub fn id(&self) -> MonitorId {
        self.id
    }

    pub fn host_handle(&self) -> HostMonitorHandle {
        self.host_handle
    }

    pub fn connector_index(&self) -> u32 {
        self.connector_index
    }

    pub fn container_id(&self) -> Uuid {
        self.container_id
    }

    /// Physical size is only exposed through the version-gated
    /// `PhysicalSizeQuery`.
    pub(crate) fn physical_size_mm(&self) -> (u32, u32) {
        self.physical_size_mm
    }

    /// Snapshot of the modes derived from the monitor description.
    pub fn default_modes(&self) -> ModeList {
        self.lock().default_modes.clone()
    }

    /// Snapshot of the modes offered to the host for this monitor.
    pub fn target_modes(&self) -> ModeList {
        self.lock().target_modes.clone()
    }

    /// The mode committed by the last successful mode commit, if any.
    pub fn committed_mode(&self) -> Option<Mode> {
        self.lock().committed
    }

    /// Handle of the currently assigned swap chain, if any.
    pub fn active_swap_chain(&self) -> Option<SwapChainHandle> {
        self.lock().swap_chain.as_ref().map(|sc| sc.handle)
    }

    /// Number of frames forwarded to the renderer and not yet released.
    pub fn in_flight_frames(&self) -> usize {
        self.lock()
            .swap_chain
            .as_ref()
            .map_or(0, |sc| sc.in_flight.len())
    }

    /// Total frames forwarded through the current swap chain.
    pub fn frames_presented(&self) -> u64 {
        self.lock()
            .swap_chain
            .as_ref()
            .map_or(0, |sc| sc.frames_presented)
    }

    /// `true` once the monitor has departed or the adapter was cleaned up.
    pub fn is_departed(&self) -> bool {
        self.lock().departed
    }

    /// Locks the mutable state.
    ///
    /// A poisoned lock is recovered: every mutation of [`MonitorState`] is a
    /// single field assignment, so a panic elsewhere cannot leave it half
    /// written.
    pub(crate) fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
