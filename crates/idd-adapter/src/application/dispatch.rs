//! Callback dispatch: the host-facing surface of the driver.
//!
//! # How the host reaches the driver (for beginners)
//!
//! The host runtime owns the control flow.  It calls a fixed set of entry
//! points, each of which must answer synchronously with a status code.  This
//! module defines:
//!
//! - [`IndirectDisplayCallbacks`] – one method per host event.
//! - [`CallbackTable`] – which of those entries are registered with the host
//!   during device-add.  Optional entries (IO-control passthrough, the
//!   physical-size query) are only registered when enabled.
//! - [`IndirectDisplayDriver`] – the implementation, which routes each
//!   callback to the adapter components and converts their typed errors into
//!   [`HostStatus`] codes at this boundary and nowhere else.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use idd_core::{
    CapabilitySet, DeviceInitHandle, FrameToken, HostStatus, ModeList, MonitorId, SwapChainHandle,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::adapter::{
    AdapterConfig, AdapterContext, AdapterError, AdapterState, DepartureOutcome, DevicePowerState,
    HostRuntime,
};
use super::io_control::{IoControlRequest, IoControlResponse};
use super::negotiate_modes::{ModeAssignment, ModeNegotiationEngine};
use super::swap_chain::{
    FrameRenderer, PhysicalSize, PhysicalSizeQuery, RenderingParams, SwapChainError,
    UnassignOutcome,
};

/// Host-invoked entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallbackKind {
    DeviceAdd,
    DevicePowerOn,
    DeviceCleanup,
    IoDeviceControl,
    ParseMonitorDescription,
    AdapterInitFinished,
    AdapterCommitModes,
    MonitorGetDefaultModes,
    MonitorQueryTargetModes,
    MonitorAssignSwapChain,
    MonitorUnassignSwapChain,
    MonitorGetPhysicalSize,
}

impl CallbackKind {
    /// Every entry point, in registration order.
    pub const ALL: [CallbackKind; 12] = [
        CallbackKind::DeviceAdd,
        CallbackKind::DevicePowerOn,
        CallbackKind::DeviceCleanup,
        CallbackKind::IoDeviceControl,
        CallbackKind::ParseMonitorDescription,
        CallbackKind::AdapterInitFinished,
        CallbackKind::AdapterCommitModes,
        CallbackKind::MonitorGetDefaultModes,
        CallbackKind::MonitorQueryTargetModes,
        CallbackKind::MonitorAssignSwapChain,
        CallbackKind::MonitorUnassignSwapChain,
        CallbackKind::MonitorGetPhysicalSize,
    ];
}

/// The set of entry points registered with the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackTable {
    registered: Vec<CallbackKind>,
}

impl CallbackTable {
    /// Builds the table for a negotiated capability set.
    pub fn for_capabilities(caps: &CapabilitySet, io_control_enabled: bool) -> Self {
        let registered = CallbackKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                CallbackKind::IoDeviceControl => io_control_enabled,
                CallbackKind::MonitorGetPhysicalSize => caps.supports_physical_size(),
                _ => true,
            })
            .collect();
        Self { registered }
    }

    pub fn is_registered(&self, kind: CallbackKind) -> bool {
        self.registered.contains(&kind)
    }

    pub fn entries(&self) -> &[CallbackKind] {
        &self.registered
    }
}

/// One method per host event.  Every method returns without blocking.
pub trait IndirectDisplayCallbacks: Send + Sync {
    fn device_add(&self, init: DeviceInitHandle) -> HostStatus;

    fn device_power_on(&self, previous: DevicePowerState) -> HostStatus;

    /// Host object teardown.  Safe to call more than once.
    fn device_cleanup(&self);

    fn io_device_control(&self, code: u32, input: &[u8]) -> IoControlResponse;

    /// Never fails: an unusable description yields the fallback mode set.
    fn parse_monitor_description(&self, description: &[u8]) -> ModeList;

    fn adapter_init_finished(&self, status: HostStatus) -> HostStatus;

    fn adapter_commit_modes(&self, request: &[ModeAssignment]) -> HostStatus;

    fn monitor_get_default_modes(&self, monitor: MonitorId) -> Result<ModeList, HostStatus>;

    fn monitor_query_target_modes(&self, monitor: MonitorId) -> Result<ModeList, HostStatus>;

    fn monitor_assign_swap_chain(
        &self,
        monitor: MonitorId,
        swap_chain: SwapChainHandle,
        params: RenderingParams,
    ) -> HostStatus;

    fn monitor_unassign_swap_chain(&self, monitor: MonitorId) -> HostStatus;

    /// Only callable with the query capability, which exists only when the
    /// negotiated version supports it.
    fn monitor_get_physical_size(
        &self,
        query: PhysicalSizeQuery,
        monitor: MonitorId,
    ) -> Result<PhysicalSize, HostStatus>;

    fn swap_chain_frame_available(&self, monitor: MonitorId, frame: FrameToken) -> HostStatus;

    fn swap_chain_frame_released(&self, monitor: MonitorId, frame: FrameToken) -> HostStatus;
}

/// The driver: owns the configuration and, between device-add and cleanup,
/// the adapter.
pub struct IndirectDisplayDriver {
    config: AdapterConfig,
    host: Arc<dyn HostRuntime>,
    renderer: Arc<dyn FrameRenderer>,
    engine: ModeNegotiationEngine,
    adapter: Mutex<Option<Arc<AdapterContext>>>,
}

impl IndirectDisplayDriver {
    pub fn new(
        config: AdapterConfig,
        host: Arc<dyn HostRuntime>,
        renderer: Arc<dyn FrameRenderer>,
    ) -> Self {
        Self {
            engine: ModeNegotiationEngine::new(config.mode_limits),
            config,
            host,
            renderer,
            adapter: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<AdapterContext>>> {
        self.adapter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The live adapter, if device-add succeeded and cleanup has not run.
    pub fn adapter(&self) -> Option<Arc<AdapterContext>> {
        self.slot().clone()
    }

    fn live_adapter(&self) -> Result<Arc<AdapterContext>, HostStatus> {
        self.adapter().ok_or_else(|| {
            warn!("callback without a live adapter");
            HostStatus::INVALID_DEVICE_STATE
        })
    }

    /// The physical-size capability of the live adapter, if it negotiated one.
    pub fn physical_size_query(&self) -> Option<PhysicalSizeQuery> {
        self.adapter().and_then(|a| a.physical_size_query())
    }

    /// Driver-initiated hot-plug.
    ///
    /// # Errors
    ///
    /// See [`AdapterContext::monitor_arrival`].
    pub fn plug_monitor(
        &self,
        description: &[u8],
        connector_index: u32,
    ) -> Result<MonitorId, AdapterError> {
        let adapter = self.adapter().ok_or(AdapterError::InvalidState {
            operation: "monitor arrival",
            state: AdapterState::Uninitialized,
        })?;
        adapter
            .monitor_arrival(description, connector_index)
            .map(|m| m.id())
    }

    /// Driver-initiated hot-plug on the lowest free connector.
    ///
    /// # Errors
    ///
    /// See [`AdapterContext::monitor_arrival`].
    pub fn plug_monitor_on_free_connector(
        &self,
        description: &[u8],
    ) -> Result<MonitorId, AdapterError> {
        let adapter = self.adapter().ok_or(AdapterError::InvalidState {
            operation: "monitor arrival",
            state: AdapterState::Uninitialized,
        })?;
        adapter
            .monitor_arrival_on_free_connector(description)
            .map(|m| m.id())
    }

    /// Driver-initiated unplug.
    pub fn unplug_monitor(&self, monitor: MonitorId) -> DepartureOutcome {
        match self.adapter() {
            Some(adapter) => adapter.monitor_departure(monitor),
            None => DepartureOutcome::AlreadyDeparted,
        }
    }

    fn handle_io_control(
        &self,
        adapter: &AdapterContext,
        request: IoControlRequest,
    ) -> IoControlResponse {
        match request {
            IoControlRequest::PlugMonitor { description } => {
                match adapter.monitor_arrival_on_free_connector(&description) {
                    Ok(monitor) => IoControlResponse::with_u32(monitor.id().0),
                    Err(e) => IoControlResponse::fail(e.status()),
                }
            }
            IoControlRequest::UnplugMonitor(id) => match adapter.monitor_departure(id) {
                DepartureOutcome::Departed => IoControlResponse::ok(Vec::new()),
                DepartureOutcome::AlreadyDeparted => IoControlResponse::fail(HostStatus::NOT_FOUND),
            },
            IoControlRequest::QueryMonitorCount => {
                IoControlResponse::with_u32(adapter.monitor_count() as u32)
            }
        }
    }
}

fn status_of<E>(result: Result<(), E>, status: impl FnOnce(&E) -> HostStatus) -> HostStatus {
    match result {
        Ok(()) => HostStatus::SUCCESS,
        Err(e) => status(&e),
    }
}

impl IndirectDisplayCallbacks for IndirectDisplayDriver {
    fn device_add(&self, init: DeviceInitHandle) -> HostStatus {
        if self.adapter().is_some() {
            warn!(%init, "device add while an adapter is live");
            return HostStatus::INVALID_DEVICE_STATE;
        }
        match AdapterContext::initialize(
            init,
            self.config.clone(),
            Arc::clone(&self.host),
            Arc::clone(&self.renderer),
        ) {
            Ok(adapter) => {
                *self.slot() = Some(adapter);
                HostStatus::SUCCESS
            }
            Err(e) => {
                warn!(error = %e, "device add failed");
                e.status()
            }
        }
    }

    fn device_power_on(&self, previous: DevicePowerState) -> HostStatus {
        match self.live_adapter() {
            Ok(adapter) => status_of(adapter.power_on(previous), AdapterError::status),
            Err(status) => status,
        }
    }

    fn device_cleanup(&self) {
        let adapter = self.slot().take();
        match adapter {
            Some(adapter) => adapter.cleanup(),
            None => debug!("cleanup without a live adapter"),
        }
    }

    fn io_device_control(&self, code: u32, input: &[u8]) -> IoControlResponse {
        if !self.config.io_control_enabled {
            debug!(code, "IO-control passthrough disabled");
            return IoControlResponse::fail(HostStatus::NOT_SUPPORTED);
        }
        let adapter = match self.live_adapter() {
            Ok(adapter) => adapter,
            Err(status) => return IoControlResponse::fail(status),
        };
        match IoControlRequest::decode(code, input) {
            Ok(request) => {
                debug!(?request, "IO-control request");
                self.handle_io_control(&adapter, request)
            }
            Err(e) => {
                warn!(error = %e, "IO-control request rejected");
                IoControlResponse::fail(e.status())
            }
        }
    }

    fn parse_monitor_description(&self, description: &[u8]) -> ModeList {
        self.engine.default_modes(description)
    }

    fn adapter_init_finished(&self, status: HostStatus) -> HostStatus {
        match self.live_adapter() {
            Ok(adapter) => {
                adapter.adapter_init_finished(status);
                HostStatus::SUCCESS
            }
            Err(status) => status,
        }
    }

    fn adapter_commit_modes(&self, request: &[ModeAssignment]) -> HostStatus {
        match self.live_adapter() {
            Ok(adapter) => match adapter.commit_modes(request) {
                Ok(_) => HostStatus::SUCCESS,
                Err(e) => e.status(),
            },
            Err(status) => status,
        }
    }

    fn monitor_get_default_modes(&self, monitor: MonitorId) -> Result<ModeList, HostStatus> {
        let adapter = self.live_adapter()?;
        let monitor = adapter.lookup(monitor).map_err(|e| e.status())?;
        Ok(monitor.default_modes())
    }

    fn monitor_query_target_modes(&self, monitor: MonitorId) -> Result<ModeList, HostStatus> {
        let adapter = self.live_adapter()?;
        let monitor = adapter.lookup(monitor).map_err(|e| e.status())?;
        Ok(adapter.mode_engine().query_target_modes(&monitor))
    }

    fn monitor_assign_swap_chain(
        &self,
        monitor: MonitorId,
        swap_chain: SwapChainHandle,
        params: RenderingParams,
    ) -> HostStatus {
        let adapter = match self.live_adapter() {
            Ok(adapter) => adapter,
            Err(status) => return status,
        };
        match adapter.lookup(monitor) {
            Ok(m) => status_of(
                adapter.swap_chains().assign(&m, swap_chain, params),
                SwapChainError::status,
            ),
            Err(e) => e.status(),
        }
    }

    fn monitor_unassign_swap_chain(&self, monitor: MonitorId) -> HostStatus {
        let adapter = match self.live_adapter() {
            Ok(adapter) => adapter,
            Err(status) => return status,
        };
        match adapter.lookup(monitor) {
            Ok(m) => {
                if adapter.swap_chains().unassign(&m) == UnassignOutcome::NotAssigned {
                    debug!(%monitor, "unassign was a no-op");
                }
                HostStatus::SUCCESS
            }
            // Departure already unassigned it.
            Err(_) => {
                debug!(%monitor, "unassign after departure");
                HostStatus::SUCCESS
            }
        }
    }

    fn monitor_get_physical_size(
        &self,
        query: PhysicalSizeQuery,
        monitor: MonitorId,
    ) -> Result<PhysicalSize, HostStatus> {
        let adapter = self.live_adapter()?;
        let monitor = adapter.lookup(monitor).map_err(|e| e.status())?;
        Ok(query.physical_size(&monitor))
    }

    fn swap_chain_frame_available(&self, monitor: MonitorId, frame: FrameToken) -> HostStatus {
        let adapter = match self.live_adapter() {
            Ok(adapter) => adapter,
            Err(status) => return status,
        };
        match adapter.lookup(monitor) {
            Ok(m) => status_of(
                adapter.swap_chains().frame_available(&m, frame),
                SwapChainError::status,
            ),
            Err(e) => e.status(),
        }
    }

    fn swap_chain_frame_released(&self, monitor: MonitorId, frame: FrameToken) -> HostStatus {
        let released = self.adapter().and_then(|adapter| {
            adapter
                .monitor(monitor)
                .map(|m| adapter.swap_chains().frame_released(&m, frame))
        });
        if released != Some(true) {
            debug!(%monitor, %frame, "released frame was not in flight");
        }
        HostStatus::SUCCESS
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
