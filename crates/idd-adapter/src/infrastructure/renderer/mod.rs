//! Frame renderer sinks.
//!
//! The renderer that actually consumes swap-chain buffers lives outside
//! this crate.  `ChannelRenderer` is the production-style hand-off: every
//! notification becomes a [`RendererEvent`] on a tokio unbounded channel,
//! so the driver side never waits on the consumer.  The receiving end is
//! usually drained by an async task (see the `idd-sim` binary).

pub mod mock;

use idd_core::{FrameToken, MonitorId};
use tokio::sync::mpsc;
use tracing::debug;

use crate::application::swap_chain::{FrameRenderer, SwapChainAssignment};

/// One renderer notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererEvent {
    Assigned(SwapChainAssignment),
    FrameAvailable { monitor: MonitorId, frame: FrameToken },
    Unassigned(MonitorId),
}

impl RendererEvent {
    pub fn monitor(&self) -> MonitorId {
        match self {
            Self::Assigned(a) => a.monitor,
            Self::FrameAvailable { monitor, .. } | Self::Unassigned(monitor) => *monitor,
        }
    }
}

/// Forwards renderer notifications over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelRenderer {
    tx: mpsc::UnboundedSender<RendererEvent>,
}

impl ChannelRenderer {
    /// Creates the renderer and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RendererEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: RendererEvent) {
        // A closed receiver means the consumer is shutting down.
        if self.tx.send(event).is_err() {
            debug!(?event, "renderer channel closed; event dropped");
        }
    }
}

impl FrameRenderer for ChannelRenderer {
    fn on_swap_chain_assigned(&self, assignment: &SwapChainAssignment) {
        self.send(RendererEvent::Assigned(*assignment));
    }

    fn on_frame_available(&self, monitor: MonitorId, frame: FrameToken) {
        self.send(RendererEvent::FrameAvailable { monitor, frame });
    }

    fn on_swap_chain_unassigned(&self, monitor: MonitorId) {
        self.send(RendererEvent::Unassigned(monitor));
    }
}
