//! In-process simulation of the host display runtime.
//!
//! `SimulatedHost` implements [`HostRuntime`] without any operating-system
//! support.  It:
//!
//! - reports a configurable protocol version and capability flags,
//! - hands out unique opaque handles from a counter,
//! - records every call as a [`HostCall`] so tests can assert on the exact
//!   sequence the driver produced,
//! - fails any [`HostStep`] on demand with a chosen status.
//!
//! # Usage in tests
//!
//! ```ignore
//! let host = Arc::new(SimulatedHost::new(ProtocolVersion(0x0002_0004)));
//! host.fail_at(HostStep::DeviceInterface, HostStatus::INSUFFICIENT_RESOURCES);
//!
//! let driver = IndirectDisplayDriver::new(config, host.clone(), renderer);
//! assert!(!driver.device_add(DeviceInitHandle(1)).is_success());
//! assert!(host.calls().contains(&HostCall::DestroyDevice(DeviceHandle(0x1000))));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use idd_core::{
    DeviceHandle, DeviceInitHandle, HostCapabilityFlags, HostMonitorHandle, HostStatus,
    HostVersionInfo, ProtocolVersion,
};
use tracing::debug;
use uuid::Uuid;

use crate::application::adapter::{
    AdapterDescriptor, DeviceAttributes, HostRuntime, MonitorCreateRequest,
};
use crate::application::dispatch::{CallbackKind, CallbackTable};

/// First handle value issued; later handles count up from here.
const FIRST_HANDLE: u64 = 0x1000;

/// Host operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostStep {
    QueryVersion,
    PowerCallbacks,
    ClientCallbacks,
    CreateDevice,
    DeviceInterface,
    InitializeDevice,
    InitAdapter,
    CreateMonitor,
    MonitorArrival,
    MonitorDeparture,
}

/// One recorded call from the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    QueryVersion,
    RegisterPowerCallbacks(DeviceInitHandle),
    RegisterClientCallbacks(Vec<CallbackKind>),
    CreateDevice {
        init: DeviceInitHandle,
        cleanup_callback: bool,
    },
    CreateDeviceInterface(DeviceHandle, Uuid),
    InitializeDevice(DeviceHandle),
    DestroyDevice(DeviceHandle),
    InitAdapter(AdapterDescriptor),
    CreateMonitor {
        connector_index: u32,
        handle: HostMonitorHandle,
    },
    MonitorArrival(HostMonitorHandle),
    MonitorDeparture(HostMonitorHandle),
}

pub struct SimulatedHost {
    version: HostVersionInfo,
    failures: Mutex<HashMap<HostStep, HostStatus>>,
    calls: Mutex<Vec<HostCall>>,
    next_handle: AtomicU64,
}

impl SimulatedHost {
    /// A host reporting `version` with no capability flags.
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            version: HostVersionInfo {
                version,
                flags: HostCapabilityFlags::NONE,
            },
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(FIRST_HANDLE),
        }
    }

    pub fn with_flags(mut self, flags: HostCapabilityFlags) -> Self {
        self.version.flags = flags;
        self
    }

    /// Makes every later call of `step` fail with `status`.
    pub fn fail_at(&self, step: HostStep, status: HostStatus) {
        lock(&self.failures).insert(step, status);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Snapshot of every call recorded so far.
    pub fn calls(&self) -> Vec<HostCall> {
        lock(&self.calls).clone()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| pred(*c)).count()
    }

    fn record(&self, call: HostCall) {
        debug!(?call, "host call");
        lock(&self.calls).push(call);
    }

    fn check(&self, step: HostStep) -> Result<(), HostStatus> {
        match lock(&self.failures).get(&step) {
            Some(status) => Err(*status),
            None => Ok(()),
        }
    }

    fn next_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HostRuntime for SimulatedHost {
    fn query_version(&self) -> Result<HostVersionInfo, HostStatus> {
        self.record(HostCall::QueryVersion);
        self.check(HostStep::QueryVersion)?;
        Ok(self.version)
    }

    fn register_power_callbacks(&self, init: DeviceInitHandle) -> Result<(), HostStatus> {
        self.record(HostCall::RegisterPowerCallbacks(init));
        self.check(HostStep::PowerCallbacks)
    }

    fn register_client_callbacks(
        &self,
        _init: DeviceInitHandle,
        table: &CallbackTable,
    ) -> Result<(), HostStatus> {
        self.record(HostCall::RegisterClientCallbacks(table.entries().to_vec()));
        self.check(HostStep::ClientCallbacks)
    }

    fn create_device(
        &self,
        init: DeviceInitHandle,
        attributes: &DeviceAttributes,
    ) -> Result<DeviceHandle, HostStatus> {
        self.record(HostCall::CreateDevice {
            init,
            cleanup_callback: attributes.cleanup_callback,
        });
        self.check(HostStep::CreateDevice)?;
        Ok(DeviceHandle(self.next_handle()))
    }

    fn create_device_interface(
        &self,
        device: DeviceHandle,
        interface: Uuid,
    ) -> Result<(), HostStatus> {
        self.record(HostCall::CreateDeviceInterface(device, interface));
        self.check(HostStep::DeviceInterface)
    }

    fn initialize_device(&self, device: DeviceHandle) -> Result<(), HostStatus> {
        self.record(HostCall::InitializeDevice(device));
        self.check(HostStep::InitializeDevice)
    }

    fn destroy_device(&self, device: DeviceHandle) {
        self.record(HostCall::DestroyDevice(device));
    }

    fn init_adapter(
        &self,
        _device: DeviceHandle,
        descriptor: &AdapterDescriptor,
    ) -> Result<(), HostStatus> {
        self.record(HostCall::InitAdapter(descriptor.clone()));
        self.check(HostStep::InitAdapter)
    }

    fn create_monitor(
        &self,
        _device: DeviceHandle,
        request: &MonitorCreateRequest,
    ) -> Result<HostMonitorHandle, HostStatus> {
        self.check(HostStep::CreateMonitor)?;
        let handle = HostMonitorHandle(self.next_handle());
        self.record(HostCall::CreateMonitor {
            connector_index: request.connector_index,
            handle,
        });
        Ok(handle)
    }

    fn report_monitor_arrival(&self, monitor: HostMonitorHandle) -> Result<(), HostStatus> {
        self.record(HostCall::MonitorArrival(monitor));
        self.check(HostStep::MonitorArrival)
    }

    fn report_monitor_departure(&self, monitor: HostMonitorHandle) -> Result<(), HostStatus> {
        self.record(HostCall::MonitorDeparture(monitor));
        self.check(HostStep::MonitorDeparture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique_and_start_at_first_handle() {
        let host = SimulatedHost::new(ProtocolVersion::DRIVER_LATEST);
        let attrs = DeviceAttributes {
            context_name: "test".to_string(),
            cleanup_callback: true,
        };

        let device = host.create_device(DeviceInitHandle(1), &attrs).unwrap();
        let monitor = host
            .create_monitor(
                device,
                &MonitorCreateRequest {
                    connector_index: 0,
                    container_id: Uuid::nil(),
                    description: Vec::new(),
                },
            )
            .unwrap();

        assert_eq!(device, DeviceHandle(FIRST_HANDLE));
        assert_eq!(monitor, HostMonitorHandle(FIRST_HANDLE + 1));
    }

    #[test]
    fn test_injected_failure_is_returned_and_call_still_recorded() {
        let host = SimulatedHost::new(ProtocolVersion::DRIVER_LATEST);
        host.fail_at(HostStep::InitializeDevice, HostStatus::UNSUCCESSFUL);

        let result = host.initialize_device(DeviceHandle(5));

        assert_eq!(result, Err(HostStatus::UNSUCCESSFUL));
        assert_eq!(host.calls(), vec![HostCall::InitializeDevice(DeviceHandle(5))]);
    }

    #[test]
    fn test_clear_failures_restores_success() {
        let host = SimulatedHost::new(ProtocolVersion::DRIVER_LATEST);
        host.fail_at(HostStep::QueryVersion, HostStatus::NOT_SUPPORTED);
        host.clear_failures();

        let info = host.query_version().unwrap();

        assert_eq!(info.version, ProtocolVersion::DRIVER_LATEST);
    }

    #[test]
    fn test_with_flags_is_reported() {
        let host = SimulatedHost::new(ProtocolVersion::DRIVER_LATEST)
            .with_flags(HostCapabilityFlags::REMOTE_SESSION);

        let info = host.query_version().unwrap();

        assert!(info.flags.contains(HostCapabilityFlags::REMOTE_SESSION));
    }
}
