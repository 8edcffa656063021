//! SwapChainManager: binds host swap chains to monitors and hands frames to
//! the renderer.
//!
//! # Lifecycle of a swap chain (for beginners)
//!
//! A *swap chain* is the buffer-exchange channel through which the host
//! delivers the desktop image for one monitor.  The host assigns one after a
//! mode has been committed, may replace it at any time (unassign followed by
//! a new assign), and drops it when the monitor goes away.
//!
//! ```text
//!   committed mode ──assign──► Assigned ──frame_available──► frame in flight
//!                                 │                              │
//!                                 │◄────────frame_released───────┘
//!                                 │
//!                            unassign / departure
//!                                 │
//!                                 ▼
//!            all in-flight frames released, renderer told to stop
//! ```
//!
//! The renderer itself is outside this crate.  It is reached through the
//! [`FrameRenderer`] trait, whose methods are fire-and-forget: they are called
//! while the monitor lock is held (so a monitor's notifications are totally
//! ordered) and must return without blocking or calling back into the driver.

use std::sync::Arc;

use idd_core::{CapabilitySet, FrameToken, HostStatus, Mode, MonitorId, SwapChainHandle};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::monitor::{ActiveSwapChain, MonitorContext, MonitorState};

/// Parameters the host supplies alongside a swap chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderingParams {
    /// Identifier of the GPU the renderer should use for this swap chain.
    pub render_adapter_luid: u64,
    /// Maximum number of frames that may be in flight at once.
    pub buffer_count: u32,
}

impl Default for RenderingParams {
    fn default() -> Self {
        Self {
            render_adapter_luid: 0,
            buffer_count: 3,
        }
    }
}

/// Everything the renderer needs to start consuming a swap chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainAssignment {
    pub monitor: MonitorId,
    pub handle: SwapChainHandle,
    pub mode: Mode,
    pub params: RenderingParams,
}

/// Notification sink for the external frame renderer.
pub trait FrameRenderer: Send + Sync {
    /// A swap chain became active for a monitor.
    fn on_swap_chain_assigned(&self, assignment: &SwapChainAssignment);

    /// A frame is ready to be consumed.
    fn on_frame_available(&self, monitor: MonitorId, frame: FrameToken);

    /// The monitor's swap chain is gone; stop rendering for it.  All frames
    /// have already been released.
    fn on_swap_chain_unassigned(&self, monitor: MonitorId);
}

/// Errors from swap-chain operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SwapChainError {
    #[error("{monitor} already has {active} assigned")]
    AlreadyAssigned {
        monitor: MonitorId,
        active: SwapChainHandle,
    },
    #[error("{0} has no committed mode")]
    NoModeCommitted(MonitorId),
    #[error("{0} has departed")]
    MonitorDeparted(MonitorId),
    #[error("{0} has no swap chain assigned")]
    NotAssigned(MonitorId),
    #[error("{monitor} already has {limit} frames in flight")]
    FrameBacklog { monitor: MonitorId, limit: u32 },
    #[error("swap chain for {0} has no buffers")]
    NoBuffers(MonitorId),
}

impl SwapChainError {
    /// Status code reported to the host for this error.
    pub fn status(&self) -> HostStatus {
        match self {
            Self::AlreadyAssigned { .. } => HostStatus::DEVICE_BUSY,
            Self::NoModeCommitted(_) | Self::NotAssigned(_) => HostStatus::INVALID_DEVICE_STATE,
            Self::MonitorDeparted(_) => HostStatus::NOT_FOUND,
            Self::FrameBacklog { .. } => HostStatus::INSUFFICIENT_RESOURCES,
            Self::NoBuffers(_) => HostStatus::INVALID_PARAMETER,
        }
    }
}

/// Result of an unassign request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnassignOutcome {
    /// A swap chain was active and has been torn down.
    Released {
        handle: SwapChainHandle,
        frames_released: usize,
    },
    /// Nothing was assigned; the request was a no-op.
    NotAssigned,
}

/// Physical dimensions of a monitor in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalSize {
    pub width_mm: u32,
    pub height_mm: u32,
}

/// Physical-size query, only obtainable when the negotiated protocol
/// version supports it.
#[derive(Debug, Clone, Copy)]
pub struct PhysicalSizeQuery {
    _gate: (),
}

impl PhysicalSizeQuery {
    /// Returns the query capability if `caps` allows it.
    pub fn for_capabilities(caps: &CapabilitySet) -> Option<Self> {
        caps.supports_physical_size().then_some(Self { _gate: () })
    }

    pub fn physical_size(&self, monitor: &MonitorContext) -> PhysicalSize {
        let (width_mm, height_mm) = monitor.physical_size_mm();
        PhysicalSize {
            width_mm,
            height_mm,
        }
    }
}

/// Owns the renderer hand-off for every monitor of one adapter.
pub struct SwapChainManager {
    renderer: Arc<dyn FrameRenderer>,
}

impl SwapChainManager {
    pub fn new(renderer: Arc<dyn FrameRenderer>) -> Self {
        Self { renderer }
    }

    /// Binds `handle` to `monitor` and notifies the renderer.
    ///
    /// # Errors
    ///
    /// - [`SwapChainError::MonitorDeparted`] if the monitor is gone.
    /// - [`SwapChainError::AlreadyAssigned`] if another swap chain is active;
    ///   the host must unassign it first.
    /// - [`SwapChainError::NoModeCommitted`] if no mode is committed.
    /// - [`SwapChainError::NoBuffers`] if `params.buffer_count` is zero.
    pub fn assign(
        &self,
        monitor: &MonitorContext,
        handle: SwapChainHandle,
        params: RenderingParams,
    ) -> Result<(), SwapChainError> {
        if params.buffer_count == 0 {
            warn!(
                monitor = %monitor.id(),
                swap_chain = %handle,
                "swap chain assignment rejected: zero buffers"
            );
            return Err(SwapChainError::NoBuffers(monitor.id()));
        }
        let mut state = monitor.lock();
        if state.departed {
            return Err(SwapChainError::MonitorDeparted(monitor.id()));
        }
        if let Some(active) = &state.swap_chain {
            warn!(
                monitor = %monitor.id(),
                active = %active.handle,
                rejected = %handle,
                "swap chain assignment rejected: another swap chain is active"
            );
            return Err(SwapChainError::AlreadyAssigned {
                monitor: monitor.id(),
                active: active.handle,
            });
        }
        let Some(mode) = state.committed else {
            warn!(monitor = %monitor.id(), "swap chain assignment rejected: no committed mode");
            return Err(SwapChainError::NoModeCommitted(monitor.id()));
        };

        state.swap_chain = Some(ActiveSwapChain {
            handle,
            params,
            in_flight: Vec::with_capacity(params.buffer_count as usize),
            frames_presented: 0,
        });
        self.renderer.on_swap_chain_assigned(&SwapChainAssignment {
            monitor: monitor.id(),
            handle,
            mode,
            params,
        });
        info!(monitor = %monitor.id(), swap_chain = %handle, %mode, "swap chain assigned");
        Ok(())
    }

    /// Tears down the active swap chain, if any.
    ///
    /// Unassigning a monitor that has nothing assigned is a no-op: the host
    /// may race an unassign against a departure.
    pub fn unassign(&self, monitor: &MonitorContext) -> UnassignOutcome {
        self.release(monitor, false)
    }

    /// Marks the monitor departed and tears down its swap chain.  Used by
    /// monitor departure and adapter cleanup.
    pub(crate) fn force_unassign(&self, monitor: &MonitorContext) -> UnassignOutcome {
        self.release(monitor, true)
    }

    fn release(&self, monitor: &MonitorContext, depart: bool) -> UnassignOutcome {
        let mut state = monitor.lock();
        if depart {
            state.departed = true;
        }
        self.release_locked(monitor.id(), &mut state)
    }

    /// Tears down the swap chain of a monitor whose lock the caller holds.
    pub(crate) fn release_locked(
        &self,
        monitor: MonitorId,
        state: &mut MonitorState,
    ) -> UnassignOutcome {
        let Some(active) = state.swap_chain.take() else {
            debug!(%monitor, "unassign with no active swap chain");
            return UnassignOutcome::NotAssigned;
        };

        let frames_released = active.in_flight.len();
        // Frames go back before the renderer hears about the teardown.
        drop(active.in_flight);
        self.renderer.on_swap_chain_unassigned(monitor);
        info!(
            %monitor,
            swap_chain = %active.handle,
            frames_released,
            frames_presented = active.frames_presented,
            "swap chain unassigned"
        );
        UnassignOutcome::Released {
            handle: active.handle,
            frames_released,
        }
    }

    /// Forwards a newly acquired frame to the renderer.
    ///
    /// # Errors
    ///
    /// [`SwapChainError::NotAssigned`] without an active swap chain and
    /// [`SwapChainError::FrameBacklog`] when `buffer_count` frames are
    /// already in flight.
    pub fn frame_available(
        &self,
        monitor: &MonitorContext,
        frame: FrameToken,
    ) -> Result<(), SwapChainError> {
        let mut state = monitor.lock();
        let Some(active) = state.swap_chain.as_mut() else {
            debug!(monitor = %monitor.id(), %frame, "frame dropped: no active swap chain");
            return Err(SwapChainError::NotAssigned(monitor.id()));
        };
        if active.in_flight.len() >= active.params.buffer_count as usize {
            return Err(SwapChainError::FrameBacklog {
                monitor: monitor.id(),
                limit: active.params.buffer_count,
            });
        }
        active.in_flight.push(frame);
        active.frames_presented += 1;
        self.renderer.on_frame_available(monitor.id(), frame);
        Ok(())
    }

    /// Retires a frame the renderer has finished with.
    ///
    /// Returns `false` if the frame was not in flight, which happens when the
    /// swap chain was unassigned while the renderer still held it.
    pub fn frame_released(&self, monitor: &MonitorContext, frame: FrameToken) -> bool {
        let mut state = monitor.lock();
        let Some(active) = state.swap_chain.as_mut() else {
            return false;
        };
        match active.in_flight.iter().position(|f| *f == frame) {
            Some(index) => {
                active.in_flight.swap_remove(index);
                true
            }
            None => false,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
