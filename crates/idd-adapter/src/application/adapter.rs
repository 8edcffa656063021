//! AdapterContext: the virtual display adapter and its monitors.
//!
//! # Adapter state machine (for beginners)
//!
//! ```text
//!  Uninitialized ─► Configuring ─► DeviceCreated ─► InterfacePublished ─► Initialized
//!                                                                            │
//!                                          power-on (host adapter init OK)   │
//!                                                                            ▼
//!                    Destroyed ◄── TearingDown ◄──────── cleanup ──────── PoweredOn
//! ```
//!
//! `initialize` walks the first four transitions synchronously during
//! device-add.  If publishing the device interface or initialising the
//! device fails, the device object created a step earlier is destroyed
//! before the error is returned, so a failed device-add leaves nothing
//! behind on the host.
//!
//! `cleanup` may be triggered from `Initialized` or `PoweredOn`.  It runs at
//! most once: a second call (or a re-entrant call from inside the first) is a
//! logged no-op.  Cleanup also closes the monitor set: an arrival whose host
//! call was still in flight when cleanup began reports the new monitor's
//! departure and fails instead of joining a destroyed adapter.
//!
//! # Calling the host
//!
//! The driver never talks to the host runtime directly.  Every outbound call
//! goes through the [`HostRuntime`] trait, implemented by the simulated host
//! in the infrastructure layer and mocked with `mockall` in unit tests.
//! Host calls are never made while the monitor set lock is held, because the
//! host may call back into the driver synchronously from inside them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use idd_core::{
    CapabilitySet, DeviceHandle, DeviceInitHandle, EdidBuilder, HostMonitorHandle, HostStatus,
    HostVersionInfo, Mode, ModeLimits, MonitorId, MonitorIdAllocator, ProtocolVersion,
    FALLBACK_MODES, GUID_DEVINTERFACE_INDIRECT_DEVICE,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::dispatch::CallbackTable;
use super::monitor::MonitorContext;
use super::negotiate_modes::{CommitError, ModeAssignment, ModeNegotiationEngine};
use super::negotiate_version::negotiate_version;
use super::swap_chain::{FrameRenderer, PhysicalSizeQuery, SwapChainManager};

// ── Host seam ─────────────────────────────────────────────────────────────────

/// Attributes attached to the device object at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAttributes {
    /// Name of the per-device context the driver keeps.
    pub context_name: String,
    /// The host must invoke the driver's cleanup callback when it deletes
    /// the device object.
    pub cleanup_callback: bool,
}

/// What the driver tells the host when asking it to bring up the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    pub name: String,
    pub max_monitors: u32,
    pub protocol_version: ProtocolVersion,
}

/// Parameters for creating a host-side monitor object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorCreateRequest {
    pub connector_index: u32,
    pub container_id: Uuid,
    /// Raw monitor description (EDID) bytes.
    pub description: Vec<u8>,
}

/// Outbound calls from the driver to the host display runtime.
///
/// Each call returns the host's status on failure.  Implementations must not
/// block indefinitely.
#[cfg_attr(test, mockall::automock)]
pub trait HostRuntime: Send + Sync {
    /// Reports the host's protocol version and capability flags.
    fn query_version(&self) -> Result<HostVersionInfo, HostStatus>;

    /// Registers the power-transition callbacks on the device-init structure.
    fn register_power_callbacks(&self, init: DeviceInitHandle) -> Result<(), HostStatus>;

    /// Registers the driver's callback table on the device-init structure.
    fn register_client_callbacks(
        &self,
        init: DeviceInitHandle,
        table: &CallbackTable,
    ) -> Result<(), HostStatus>;

    fn create_device(
        &self,
        init: DeviceInitHandle,
        attributes: &DeviceAttributes,
    ) -> Result<DeviceHandle, HostStatus>;

    /// Publishes a device interface so other components can discover the adapter.
    fn create_device_interface(&self, device: DeviceHandle, interface: Uuid)
        -> Result<(), HostStatus>;

    fn initialize_device(&self, device: DeviceHandle) -> Result<(), HostStatus>;

    /// Deletes a device object whose construction could not be completed.
    fn destroy_device(&self, device: DeviceHandle);

    /// Asks the host to initialise the display adapter.  The host answers
    /// later through the adapter-init-finished callback.
    fn init_adapter(
        &self,
        device: DeviceHandle,
        descriptor: &AdapterDescriptor,
    ) -> Result<(), HostStatus>;

    fn create_monitor(
        &self,
        device: DeviceHandle,
        request: &MonitorCreateRequest,
    ) -> Result<HostMonitorHandle, HostStatus>;

    fn report_monitor_arrival(&self, monitor: HostMonitorHandle) -> Result<(), HostStatus>;

    fn report_monitor_departure(&self, monitor: HostMonitorHandle) -> Result<(), HostStatus>;
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// A monitor that is plugged in automatically once the adapter is up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSpec {
    /// Modes in preference order.
    pub modes: Vec<Mode>,
    pub physical_size_mm: Option<(u32, u32)>,
    pub name: Option<String>,
}

impl MonitorSpec {
    /// Synthesises the description bytes reported to the host.
    ///
    /// A monitor whose modes cannot be encoded falls back to the safe mode set
    /// rather than failing the plug.
    pub fn description(&self, serial: u32, default_size_mm: (u32, u32)) -> Vec<u8> {
        let (width_mm, height_mm) = self.physical_size_mm.unwrap_or(default_size_mm);
        let mut builder = EdidBuilder::new(self.modes.iter().copied())
            .serial(serial)
            .physical_size_mm(width_mm, height_mm);
        if let Some(name) = &self.name {
            builder = builder.monitor_name(name.as_str());
        }
        match builder.build() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, serial, "monitor modes not encodable; using fallback modes");
                EdidBuilder::new(FALLBACK_MODES)
                    .serial(serial)
                    .physical_size_mm(width_mm, height_mm)
                    .build()
                    .unwrap_or_default()
            }
        }
    }
}

/// Adapter-level settings, resolved from the on-disk configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    pub name: String,
    pub minimum_version: ProtocolVersion,
    pub max_monitors: u32,
    pub io_control_enabled: bool,
    pub mode_limits: ModeLimits,
    /// Used when a monitor description does not carry a physical size.
    pub default_physical_size_mm: (u32, u32),
    pub monitors: Vec<MonitorSpec>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            name: "Virtual Indirect Display Adapter".to_string(),
            minimum_version: ProtocolVersion::DRIVER_MINIMUM,
            max_monitors: 4,
            io_control_enabled: false,
            mode_limits: ModeLimits::UNLIMITED,
            default_physical_size_mm: (527, 296),
            monitors: vec![MonitorSpec {
                modes: vec![
                    Mode::new(1920, 1080, 60),
                    Mode::new(1280, 720, 60),
                    Mode::new(1024, 768, 60),
                ],
                physical_size_mm: None,
                name: Some("Virtual 1".to_string()),
            }],
        }
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Adapter lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterState {
    Uninitialized,
    Configuring,
    DeviceCreated,
    InterfacePublished,
    Initialized,
    PoweredOn,
    TearingDown,
    Destroyed,
}

impl AdapterState {
    /// `true` if the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: AdapterState) -> bool {
        use AdapterState::*;
        matches!(
            (self, next),
            (Uninitialized, Configuring)
                | (Configuring, DeviceCreated)
                | (DeviceCreated, InterfacePublished)
                | (InterfacePublished, Initialized)
                | (Initialized, PoweredOn)
                | (Initialized | PoweredOn, TearingDown)
                | (TearingDown, Destroyed)
        )
    }
}

/// Host power state the device is leaving when it powers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DevicePowerState {
    D0,
    D1,
    D2,
    D3,
}

/// Guarded adapter state with logged transitions.
struct Lifecycle {
    state: Mutex<AdapterState>,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: Mutex::new(AdapterState::Uninitialized),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AdapterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> AdapterState {
        *self.lock()
    }

    /// Moves to `next` if allowed.  Returns the state that blocked the move.
    fn advance(&self, next: AdapterState) -> Result<(), AdapterState> {
        let mut state = self.lock();
        if !state.can_transition_to(next) {
            warn!(from = ?*state, to = ?next, "adapter state transition refused");
            return Err(*state);
        }
        info!(from = ?*state, to = ?next, "adapter state transition");
        *state = next;
        Ok(())
    }

    /// Moves to `next` where the caller's own sequencing guarantees the move
    /// is allowed.
    fn enter(&self, next: AdapterState) {
        let result = self.advance(next);
        if let Err(from) = result {
            error!(?from, to = ?next, "adapter lifecycle out of sequence");
        }
        debug_assert!(result.is_ok(), "adapter lifecycle out of sequence");
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// A step of the device-add sequence failed.  Carries the host's status.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("registering power callbacks failed: {0}")]
    PowerCallbacks(HostStatus),
    #[error("registering client callbacks failed: {0}")]
    ClientCallbacks(HostStatus),
    #[error("creating the device object failed: {0}")]
    DeviceCreate(HostStatus),
    #[error("publishing the device interface failed: {0}")]
    InterfacePublish(HostStatus),
    #[error("initializing the device failed: {0}")]
    DeviceInitialize(HostStatus),
}

impl ConfigurationError {
    pub fn status(&self) -> HostStatus {
        match self {
            Self::PowerCallbacks(s)
            | Self::ClientCallbacks(s)
            | Self::DeviceCreate(s)
            | Self::InterfacePublish(s)
            | Self::DeviceInitialize(s) => *s,
        }
    }
}

/// Errors from adapter operations after construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error("{operation} is not valid in adapter state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: AdapterState,
    },
    #[error("adapter already has the maximum of {max} monitors")]
    TooManyMonitors { max: u32 },
    #[error("{0} is not attached to this adapter")]
    MonitorNotFound(MonitorId),
    #[error("host adapter initialization failed: {0}")]
    AdapterInit(HostStatus),
    #[error("host monitor creation failed: {0}")]
    MonitorCreate(HostStatus),
    #[error("host rejected monitor arrival: {0}")]
    MonitorArrival(HostStatus),
}

impl AdapterError {
    pub fn status(&self) -> HostStatus {
        match self {
            Self::InvalidState { .. } => HostStatus::INVALID_DEVICE_STATE,
            Self::TooManyMonitors { .. } => HostStatus::INSUFFICIENT_RESOURCES,
            Self::MonitorNotFound(_) => HostStatus::NOT_FOUND,
            Self::AdapterInit(s) | Self::MonitorCreate(s) | Self::MonitorArrival(s) => *s,
        }
    }
}

/// Result of a departure request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartureOutcome {
    Departed,
    /// The monitor was already gone (departure raced teardown).
    AlreadyDeparted,
}

// ── Adapter ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MonitorSet {
    monitors: Vec<Arc<MonitorContext>>,
    /// Connectors held by arrivals whose host calls are still in progress.
    pending: Vec<u32>,
    /// Set by cleanup; no monitor may join afterwards.
    closed: bool,
}

impl MonitorSet {
    fn occupied(&self) -> usize {
        self.monitors.len() + self.pending.len()
    }

    fn connector_in_use(&self, connector: u32) -> bool {
        self.pending.contains(&connector)
            || self.monitors.iter().any(|m| m.connector_index() == connector)
    }

    /// Lowest connector index held by neither a live nor a pending monitor.
    fn free_connector(&self) -> u32 {
        (0..).find(|c| !self.connector_in_use(*c)).unwrap_or(u32::MAX)
    }

    fn release_pending(&mut self, connector: u32) {
        if let Some(index) = self.pending.iter().position(|c| *c == connector) {
            self.pending.swap_remove(index);
        }
    }
}

/// The virtual display adapter.
pub struct AdapterContext {
    device: DeviceHandle,
    config: AdapterConfig,
    capabilities: CapabilitySet,
    callbacks: CallbackTable,
    physical_size: Option<PhysicalSizeQuery>,
    host: Arc<dyn HostRuntime>,
    modes: ModeNegotiationEngine,
    swap_chains: SwapChainManager,
    lifecycle: Lifecycle,
    monitors: Mutex<MonitorSet>,
    ids: MonitorIdAllocator,
    cleaned_up: AtomicBool,
}

impl AdapterContext {
    /// Runs the device-add sequence.
    ///
    /// 1. Negotiate the protocol version (a mismatch only degrades).
    /// 2. Register the power callbacks.
    /// 3. Register the client callback table.
    /// 4. Create the device object with the cleanup callback attached.
    /// 5. Publish the device interface.
    /// 6. Initialise the device.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigurationError`] of the first failing step.  When
    /// step 5 or 6 fails the device object is destroyed first.
    pub fn initialize(
        init: DeviceInitHandle,
        config: AdapterConfig,
        host: Arc<dyn HostRuntime>,
        renderer: Arc<dyn FrameRenderer>,
    ) -> Result<Arc<Self>, ConfigurationError> {
        let lifecycle = Lifecycle::new();
        let capabilities = negotiate_version(host.as_ref(), config.minimum_version);
        let callbacks = CallbackTable::for_capabilities(&capabilities, config.io_control_enabled);
        lifecycle.enter(AdapterState::Configuring);

        host.register_power_callbacks(init).map_err(|status| {
            error!(%status, "device add failed: power callbacks");
            ConfigurationError::PowerCallbacks(status)
        })?;
        host.register_client_callbacks(init, &callbacks)
            .map_err(|status| {
                error!(%status, "device add failed: client callbacks");
                ConfigurationError::ClientCallbacks(status)
            })?;

        let attributes = DeviceAttributes {
            context_name: "AdapterContext".to_string(),
            cleanup_callback: true,
        };
        let device = host.create_device(init, &attributes).map_err(|status| {
            error!(%status, "device add failed: device create");
            ConfigurationError::DeviceCreate(status)
        })?;
        lifecycle.enter(AdapterState::DeviceCreated);

        if let Err(status) = host.create_device_interface(device, GUID_DEVINTERFACE_INDIRECT_DEVICE)
        {
            error!(%status, %device, "device add failed: interface publish; destroying device");
            host.destroy_device(device);
            return Err(ConfigurationError::InterfacePublish(status));
        }
        lifecycle.enter(AdapterState::InterfacePublished);

        if let Err(status) = host.initialize_device(device) {
            error!(%status, %device, "device add failed: device initialize; destroying device");
            host.destroy_device(device);
            return Err(ConfigurationError::DeviceInitialize(status));
        }
        lifecycle.enter(AdapterState::Initialized);

        info!(
            %device,
            version = %capabilities.version(),
            degraded = capabilities.is_degraded(),
            "adapter initialized"
        );
        Ok(Arc::new(Self {
            device,
            physical_size: PhysicalSizeQuery::for_capabilities(&capabilities),
            modes: ModeNegotiationEngine::new(config.mode_limits),
            swap_chains: SwapChainManager::new(renderer),
            config,
            capabilities,
            callbacks,
            host,
            lifecycle,
            monitors: Mutex::new(MonitorSet::default()),
            ids: MonitorIdAllocator::new(),
            cleaned_up: AtomicBool::new(false),
        }))
    }

    pub fn device(&self) -> DeviceHandle {
        self.device
    }

    pub fn state(&self) -> AdapterState {
        self.lifecycle.current()
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn callbacks(&self) -> &CallbackTable {
        &self.callbacks
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn mode_engine(&self) -> &ModeNegotiationEngine {
        &self.modes
    }

    pub fn swap_chains(&self) -> &SwapChainManager {
        &self.swap_chains
    }

    /// The physical-size query, present only when the negotiated version
    /// supports it.
    pub fn physical_size_query(&self) -> Option<PhysicalSizeQuery> {
        self.physical_size
    }

    // ── Power ────────────────────────────────────────────────────────────────

    /// Handles entry into the powered-on state.
    ///
    /// The first power-on asks the host to initialise the adapter.  Later
    /// power-ons (resume) are accepted without repeating that.
    ///
    /// # Errors
    ///
    /// [`AdapterError::AdapterInit`] if the host refuses; the adapter stays
    /// `Initialized` so a later power-on can retry.
    pub fn power_on(&self, previous: DevicePowerState) -> Result<(), AdapterError> {
        match self.state() {
            AdapterState::PoweredOn => {
                debug!(?previous, "power on while already powered on");
                Ok(())
            }
            AdapterState::Initialized => {
                let descriptor = AdapterDescriptor {
                    name: self.config.name.clone(),
                    max_monitors: self.config.max_monitors,
                    protocol_version: self.capabilities.version(),
                };
                self.host
                    .init_adapter(self.device, &descriptor)
                    .map_err(|status| {
                        error!(%status, "host adapter initialization failed");
                        AdapterError::AdapterInit(status)
                    })?;
                self.lifecycle
                    .advance(AdapterState::PoweredOn)
                    .map_err(|state| AdapterError::InvalidState {
                        operation: "power on",
                        state,
                    })?;
                info!(?previous, adapter = %self.config.name, "adapter powered on");
                Ok(())
            }
            state => Err(AdapterError::InvalidState {
                operation: "power on",
                state,
            }),
        }
    }

    /// Handles the host's adapter-init-finished notification.
    ///
    /// On success, plugs every configured monitor and returns their ids.  A
    /// monitor that fails to plug is logged and skipped.
    pub fn adapter_init_finished(&self, status: HostStatus) -> Vec<MonitorId> {
        if !status.is_success() {
            warn!(%status, "host reported adapter initialization failure");
            return Vec::new();
        }

        let mut plugged = Vec::with_capacity(self.config.monitors.len());
        for (index, spec) in self.config.monitors.iter().enumerate() {
            let connector = index as u32;
            let description = spec.description(connector + 1, self.config.default_physical_size_mm);
            match self.monitor_arrival(&description, connector) {
                Ok(monitor) => plugged.push(monitor.id()),
                Err(e) => warn!(error = %e, connector, "configured monitor not plugged"),
            }
        }
        info!(count = plugged.len(), "adapter init finished");
        plugged
    }

    // ── Monitors ─────────────────────────────────────────────────────────────

    fn lock_monitors(&self) -> MutexGuard<'_, MonitorSet> {
        self.monitors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Plugs a monitor described by `description` on `connector_index`.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::InvalidState`] unless the adapter is powered on, or
    ///   when cleanup starts while the host is creating the monitor.
    /// - [`AdapterError::TooManyMonitors`] at the configured limit.
    /// - [`AdapterError::MonitorCreate`] / [`AdapterError::MonitorArrival`]
    ///   when the host refuses.
    pub fn monitor_arrival(
        &self,
        description: &[u8],
        connector_index: u32,
    ) -> Result<Arc<MonitorContext>, AdapterError> {
        let connector = self.reserve_connector(Some(connector_index))?;
        self.arrive(description, connector)
    }

    /// Plugs a monitor on the lowest connector index no live monitor uses.
    ///
    /// # Errors
    ///
    /// As [`AdapterContext::monitor_arrival`].
    pub fn monitor_arrival_on_free_connector(
        &self,
        description: &[u8],
    ) -> Result<Arc<MonitorContext>, AdapterError> {
        let connector = self.reserve_connector(None)?;
        self.arrive(description, connector)
    }

    fn reserve_connector(&self, requested: Option<u32>) -> Result<u32, AdapterError> {
        let state = self.state();
        if state != AdapterState::PoweredOn {
            return Err(AdapterError::InvalidState {
                operation: "monitor arrival",
                state,
            });
        }
        let mut set = self.lock_monitors();
        if set.closed {
            return Err(AdapterError::InvalidState {
                operation: "monitor arrival",
                state: self.state(),
            });
        }
        if set.occupied() >= self.config.max_monitors as usize {
            warn!(max = self.config.max_monitors, "monitor arrival rejected: adapter full");
            return Err(AdapterError::TooManyMonitors {
                max: self.config.max_monitors,
            });
        }
        let connector = requested.unwrap_or_else(|| set.free_connector());
        set.pending.push(connector);
        Ok(connector)
    }

    fn arrive(
        &self,
        description: &[u8],
        connector_index: u32,
    ) -> Result<Arc<MonitorContext>, AdapterError> {
        let request = MonitorCreateRequest {
            connector_index,
            container_id: Uuid::new_v4(),
            description: description.to_vec(),
        };
        let monitor = match self.host.create_monitor(self.device, &request) {
            Ok(handle) => {
                let described = self.modes.describe(description);
                Arc::new(MonitorContext::new(
                    self.ids.next(),
                    handle,
                    connector_index,
                    request.container_id,
                    described
                        .physical_size_mm
                        .unwrap_or(self.config.default_physical_size_mm),
                    described.default_modes,
                    described.target_modes,
                ))
            }
            Err(status) => {
                self.lock_monitors().release_pending(connector_index);
                error!(%status, connector_index, "host monitor creation failed");
                return Err(AdapterError::MonitorCreate(status));
            }
        };

        // Visible before arrival is reported: the host may query modes from
        // inside the arrival call.
        let joined = {
            let mut set = self.lock_monitors();
            set.release_pending(connector_index);
            if !set.closed {
                set.monitors.push(Arc::clone(&monitor));
            }
            !set.closed
        };
        if !joined {
            // Cleanup ran while the host was creating the monitor.
            warn!(monitor = %monitor.id(), "monitor created during cleanup; departing it");
            self.depart(&monitor);
            return Err(AdapterError::InvalidState {
                operation: "monitor arrival",
                state: self.state(),
            });
        }

        if let Err(status) = self.host.report_monitor_arrival(monitor.host_handle()) {
            error!(%status, monitor = %monitor.id(), "host rejected monitor arrival");
            self.lock_monitors()
                .monitors
                .retain(|m| m.id() != monitor.id());
            monitor.lock().departed = true;
            return Err(AdapterError::MonitorArrival(status));
        }

        info!(
            monitor = %monitor.id(),
            host_handle = %monitor.host_handle(),
            connector_index,
            modes = %monitor.default_modes(),
            "monitor arrived"
        );
        Ok(monitor)
    }

    /// Unplugs a monitor.  The swap chain is force-unassigned first, then the
    /// host is told.  Unknown ids are a benign race and return
    /// [`DepartureOutcome::AlreadyDeparted`].
    pub fn monitor_departure(&self, id: MonitorId) -> DepartureOutcome {
        let removed = {
            let mut set = self.lock_monitors();
            set.monitors
                .iter()
                .position(|m| m.id() == id)
                .map(|index| set.monitors.remove(index))
        };
        let Some(monitor) = removed else {
            debug!(monitor = %id, "departure for unknown monitor; already gone");
            return DepartureOutcome::AlreadyDeparted;
        };
        self.depart(&monitor);
        info!(monitor = %id, "monitor departed");
        DepartureOutcome::Departed
    }

    fn depart(&self, monitor: &MonitorContext) {
        self.swap_chains.force_unassign(monitor);
        if let Err(status) = self.host.report_monitor_departure(monitor.host_handle()) {
            warn!(%status, monitor = %monitor.id(), "host rejected monitor departure");
        }
    }

    pub fn monitor(&self, id: MonitorId) -> Option<Arc<MonitorContext>> {
        self.lock_monitors()
            .monitors
            .iter()
            .find(|m| m.id() == id)
            .cloned()
    }

    /// Looks up a monitor, failing with [`AdapterError::MonitorNotFound`].
    pub fn lookup(&self, id: MonitorId) -> Result<Arc<MonitorContext>, AdapterError> {
        self.monitor(id).ok_or(AdapterError::MonitorNotFound(id))
    }

    /// Snapshot of the attached monitors in arrival order.
    pub fn monitors(&self) -> Vec<Arc<MonitorContext>> {
        self.lock_monitors().monitors.clone()
    }

    pub fn monitor_count(&self) -> usize {
        self.lock_monitors().monitors.len()
    }

    /// Applies a multi-monitor mode commit atomically.
    ///
    /// # Errors
    ///
    /// See [`CommitError`].
    pub fn commit_modes(
        &self,
        request: &[ModeAssignment],
    ) -> Result<Vec<ModeAssignment>, CommitError> {
        self.modes
            .commit_modes(|id| self.monitor(id), &self.swap_chains, request)
    }

    // ── Teardown ─────────────────────────────────────────────────────────────

    /// Tears the adapter down.  Runs at most once.
    pub fn cleanup(&self) {
        if self.cleaned_up.swap(true, Ordering::AcqRel) {
            debug!("cleanup already ran");
            return;
        }
        if let Err(state) = self.lifecycle.advance(AdapterState::TearingDown) {
            warn!(?state, "cleanup from unexpected state");
        }

        let drained = {
            let mut set = self.lock_monitors();
            set.closed = true;
            std::mem::take(&mut set.monitors)
        };
        for monitor in &drained {
            self.depart(monitor);
        }
        self.lifecycle.enter(AdapterState::Destroyed);
        info!(monitors = drained.len(), "adapter cleaned up");
    }

    pub fn is_cleaned_up(&self) -> bool {
        self.cleaned_up.load(Ordering::Acquire)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
