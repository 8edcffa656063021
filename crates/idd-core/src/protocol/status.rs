//! Host status codes.
//!
//! Every callback answers the host with a 32-bit status value.  Zero means
//! success; the two top bits encode the severity (`00` = success, `01` =
//! informational, `10` = warning, `11` = error).  Only the codes this driver
//! actually returns are named here.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A status code in the host's vocabulary.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostStatus(pub u32);

impl HostStatus {
    pub const SUCCESS: HostStatus = HostStatus(0x0000_0000);
    pub const DEVICE_BUSY: HostStatus = HostStatus(0x8000_0011);
    pub const UNSUCCESSFUL: HostStatus = HostStatus(0xC000_0001);
    pub const INVALID_PARAMETER: HostStatus = HostStatus(0xC000_000D);
    pub const INVALID_DEVICE_REQUEST: HostStatus = HostStatus(0xC000_0010);
    pub const INSUFFICIENT_RESOURCES: HostStatus = HostStatus(0xC000_009A);
    pub const NOT_SUPPORTED: HostStatus = HostStatus(0xC000_00BB);
    pub const INVALID_DEVICE_STATE: HostStatus = HostStatus(0xC000_0184);
    pub const NOT_FOUND: HostStatus = HostStatus(0xC000_0225);

    /// Success and informational codes have the top severity bit clear.
    pub const fn is_success(self) -> bool {
        self.0 & 0x8000_0000 == 0
    }

    /// Converts to `Ok(())` for success codes and `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), HostStatus> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Symbolic name for known codes.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::SUCCESS => "STATUS_SUCCESS",
            Self::DEVICE_BUSY => "STATUS_DEVICE_BUSY",
            Self::UNSUCCESSFUL => "STATUS_UNSUCCESSFUL",
            Self::INVALID_PARAMETER => "STATUS_INVALID_PARAMETER",
            Self::INVALID_DEVICE_REQUEST => "STATUS_INVALID_DEVICE_REQUEST",
            Self::INSUFFICIENT_RESOURCES => "STATUS_INSUFFICIENT_RESOURCES",
            Self::NOT_SUPPORTED => "STATUS_NOT_SUPPORTED",
            Self::INVALID_DEVICE_STATE => "STATUS_INVALID_DEVICE_STATE",
            Self::NOT_FOUND => "STATUS_NOT_FOUND",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({:#010x})", self.0),
            None => write!(f, "{:#010x}", self.0),
        }
    }
}

impl fmt::Debug for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
