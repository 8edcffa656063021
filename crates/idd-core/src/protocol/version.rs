//! Protocol version negotiation rules and the negotiated capability set.
//!
//! # How versions are compared (for beginners)
//!
//! The host runtime reports a single 32-bit protocol version: the major
//! number lives in the high 16 bits and the minor number in the low 16 bits,
//! so `0x0002_0004` reads as "2.4".  Because the encoding is big-end-first,
//! plain integer comparison orders versions correctly.
//!
//! Three thresholds matter to this driver:
//!
//! | Constant                                  | Value         | Meaning                               |
//! |-------------------------------------------|---------------|---------------------------------------|
//! | [`ProtocolVersion::DRIVER_MINIMUM`]       | `0x0002_0000` | Below this the adapter runs degraded  |
//! | [`ProtocolVersion::PHYSICAL_SIZE`]        | `0x0002_0004` | Physical-size callback is available   |
//! | [`ProtocolVersion::DRIVER_LATEST`]        | `0x0002_0004` | Newest version this driver knows      |
//!
//! A host *below* the minimum is not fatal: the mismatch is reported and the
//! adapter continues with optional capabilities switched off.  A host *above*
//! the latest known version is passed through unchanged.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::protocol::status::HostStatus;

/// A host display-runtime protocol version (`major << 16 | minor`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(pub u32);

impl ProtocolVersion {
    /// Placeholder used when the host could not report a version.
    pub const UNKNOWN: ProtocolVersion = ProtocolVersion(0);
    pub const DRIVER_MINIMUM: ProtocolVersion = ProtocolVersion(0x0002_0000);
    pub const DRIVER_LATEST: ProtocolVersion = ProtocolVersion(0x0002_0004);
    /// First version that carries the monitor physical-size callback.
    pub const PHYSICAL_SIZE: ProtocolVersion = ProtocolVersion(0x0002_0004);

    pub const fn from_parts(major: u16, minor: u16) -> Self {
        Self(((major as u32) << 16) | minor as u32)
    }

    pub const fn major(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn minor(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({:#010x})", self.major(), self.minor(), self.0)
    }
}

/// Adapter-level capability flags reported by the host alongside its version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostCapabilityFlags(pub u32);

impl HostCapabilityFlags {
    pub const NONE: HostCapabilityFlags = HostCapabilityFlags(0);
    /// The host prefers the smallest mode when several match.
    pub const SMALLEST_MODE: HostCapabilityFlags = HostCapabilityFlags(0x1);
    /// The host can deliver move regions with each frame.
    pub const MOVE_REGIONS: HostCapabilityFlags = HostCapabilityFlags(0x2);
    /// The adapter runs inside a remote session.
    pub const REMOTE_SESSION: HostCapabilityFlags = HostCapabilityFlags(0x4);

    /// Returns `true` if every bit of `other` is set in `self`.
    pub const fn contains(self, other: HostCapabilityFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for HostCapabilityFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// What the host reports when asked for its version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostVersionInfo {
    pub version: ProtocolVersion,
    pub flags: HostCapabilityFlags,
}

/// How version negotiation concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// Host version is within `[minimum, DRIVER_LATEST]`.
    Accepted,
    /// Host version is newer than anything this driver knows; passed through.
    ForwardCompatible,
    /// Host version is older than the driver minimum; capabilities degrade.
    BelowMinimum,
    /// The host could not report its version.
    QueryFailed(HostStatus),
}

impl NegotiationOutcome {
    /// `true` for [`Accepted`](Self::Accepted) and
    /// [`ForwardCompatible`](Self::ForwardCompatible).
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Accepted | Self::ForwardCompatible)
    }
}

/// The capability set negotiated once at adapter-add time.
///
/// Fields are private: the set is read-only for the adapter's lifetime and
/// can be shared between threads without a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    version: ProtocolVersion,
    minimum: ProtocolVersion,
    host_flags: HostCapabilityFlags,
    outcome: NegotiationOutcome,
    physical_size: bool,
}

impl CapabilitySet {
    /// Applies the negotiation rules to what the host reported.
    ///
    /// The reported version is never modified: the negotiated version is the
    /// host version, whatever the outcome.
    pub fn negotiate(
        reported: Result<HostVersionInfo, HostStatus>,
        minimum: ProtocolVersion,
    ) -> Self {
        let info = match reported {
            Ok(info) => info,
            Err(status) => {
                return Self {
                    version: ProtocolVersion::UNKNOWN,
                    minimum,
                    host_flags: HostCapabilityFlags::NONE,
                    outcome: NegotiationOutcome::QueryFailed(status),
                    physical_size: false,
                };
            }
        };

        let outcome = if info.version < minimum {
            NegotiationOutcome::BelowMinimum
        } else if info.version > ProtocolVersion::DRIVER_LATEST {
            NegotiationOutcome::ForwardCompatible
        } else {
            NegotiationOutcome::Accepted
        };

        Self {
            version: info.version,
            minimum,
            host_flags: info.flags,
            outcome,
            physical_size: outcome.is_ok() && info.version >= ProtocolVersion::PHYSICAL_SIZE,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn minimum(&self) -> ProtocolVersion {
        self.minimum
    }

    pub fn host_flags(&self) -> HostCapabilityFlags {
        self.host_flags
    }

    pub fn outcome(&self) -> NegotiationOutcome {
        self.outcome
    }

    /// `true` when negotiation did not succeed and optional capabilities are off.
    pub fn is_degraded(&self) -> bool {
        !self.outcome.is_ok()
    }

    /// `true` when the monitor physical-size callback is available.
    pub fn supports_physical_size(&self) -> bool {
        self.physical_size
    }
}
