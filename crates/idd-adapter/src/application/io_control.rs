//! IO-control requests the driver accepts when passthrough is enabled.
//!
//! Codes follow the host's device-control layout: device type
//! `FILE_DEVICE_UNKNOWN` (0x22), buffered transfer, any access, function
//! numbers starting at 0x800.  All integers are little-endian.

use idd_core::{HostStatus, MonitorId};
use thiserror::Error;

/// Plug a monitor.  Input: description bytes.  Output: monitor id (u32).
pub const IOCTL_PLUG_MONITOR: u32 = ctl_code(0x800);
/// Unplug a monitor.  Input: monitor id (u32).  No output.
pub const IOCTL_UNPLUG_MONITOR: u32 = ctl_code(0x801);
/// Query the attached monitor count.  Output: count (u32).
pub const IOCTL_QUERY_MONITOR_COUNT: u32 = ctl_code(0x802);

const fn ctl_code(function: u32) -> u32 {
    const FILE_DEVICE_UNKNOWN: u32 = 0x22;
    (FILE_DEVICE_UNKNOWN << 16) | (function << 2)
}

/// A decoded IO-control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoControlRequest {
    PlugMonitor { description: Vec<u8> },
    UnplugMonitor(MonitorId),
    QueryMonitorCount,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IoControlError {
    #[error("unknown IO-control code {0:#010x}")]
    UnknownCode(u32),
    #[error("IO-control {code:#010x} needs {expected} input bytes, got {actual}")]
    InputTooShort {
        code: u32,
        expected: usize,
        actual: usize,
    },
}

impl IoControlError {
    pub fn status(&self) -> HostStatus {
        match self {
            Self::UnknownCode(_) => HostStatus::INVALID_DEVICE_REQUEST,
            Self::InputTooShort { .. } => HostStatus::INVALID_PARAMETER,
        }
    }
}

impl IoControlRequest {
    /// Decodes `code` and its input buffer.
    ///
    /// # Errors
    ///
    /// [`IoControlError::UnknownCode`] for codes this driver does not define
    /// and [`IoControlError::InputTooShort`] for truncated inputs.
    pub fn decode(code: u32, input: &[u8]) -> Result<Self, IoControlError> {
        match code {
            IOCTL_PLUG_MONITOR => Ok(Self::PlugMonitor {
                description: input.to_vec(),
            }),
            IOCTL_UNPLUG_MONITOR => {
                let bytes: [u8; 4] = input
                    .get(..4)
                    .and_then(|b| b.try_into().ok())
                    .ok_or(IoControlError::InputTooShort {
                        code,
                        expected: 4,
                        actual: input.len(),
                    })?;
                Ok(Self::UnplugMonitor(MonitorId(u32::from_le_bytes(bytes))))
            }
            IOCTL_QUERY_MONITOR_COUNT => Ok(Self::QueryMonitorCount),
            other => Err(IoControlError::UnknownCode(other)),
        }
    }
}

/// Completion of an IO-control request: status plus output buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoControlResponse {
    pub status: HostStatus,
    pub output: Vec<u8>,
}

impl IoControlResponse {
    pub fn ok(output: Vec<u8>) -> Self {
        Self {
            status: HostStatus::SUCCESS,
            output,
        }
    }

    pub fn fail(status: HostStatus) -> Self {
        Self {
            status,
            output: Vec::new(),
        }
    }

    /// Success carrying a single little-endian u32.
    pub fn with_u32(value: u32) -> Self {
        Self::ok(value.to_le_bytes().to_vec())
    }
}
