//! Recording renderer for tests.
//!
//! Every notification is pushed into a `Mutex<Vec<RendererEvent>>` so that
//! assertions can check exactly which events arrived and in what order.
//!
//! # Usage in tests
//!
//! ```ignore
//! let renderer = Arc::new(RecordingRenderer::new());
//! let manager = SwapChainManager::new(renderer.clone());
//!
//! manager.assign(&monitor, SwapChainHandle(0x10), RenderingParams::default())?;
//!
//! assert!(matches!(renderer.events()[0], RendererEvent::Assigned(_)));
//! ```

use std::sync::{Mutex, PoisonError};

use idd_core::{FrameToken, MonitorId};

use super::RendererEvent;
use crate::application::swap_chain::{FrameRenderer, SwapChainAssignment};

#[derive(Debug, Default)]
pub struct RecordingRenderer {
    events: Mutex<Vec<RendererEvent>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far.
    pub fn events(&self) -> Vec<RendererEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events recorded for one monitor.
    pub fn events_for(&self, monitor: MonitorId) -> Vec<RendererEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.monitor() == monitor)
            .collect()
    }

    fn record(&self, event: RendererEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl FrameRenderer for RecordingRenderer {
    fn on_swap_chain_assigned(&self, assignment: &SwapChainAssignment) {
        self.record(RendererEvent::Assigned(*assignment));
    }

    fn on_frame_available(&self, monitor: MonitorId, frame: FrameToken) {
        self.record(RendererEvent::FrameAvailable { monitor, frame });
    }

    fn on_swap_chain_unassigned(&self, monitor: MonitorId) {
        self.record(RendererEvent::Unassigned(monitor));
    }
}
