//! Version negotiation with the host display runtime.
//!
//! Runs once, at the start of device-add.  A mismatch never aborts adapter
//! construction: it only narrows the capability set.

use idd_core::{CapabilitySet, NegotiationOutcome, ProtocolVersion};
use tracing::{info, warn};

use super::adapter::HostRuntime;

/// Queries the host version and derives the adapter's capability set.
///
/// `minimum` is the lowest host version this driver fully supports (normally
/// [`ProtocolVersion::DRIVER_MINIMUM`]).  The returned set carries both the
/// negotiated version and the `ok` flag
/// (`capabilities.outcome().is_ok()`).
pub fn negotiate_version(host: &dyn HostRuntime, minimum: ProtocolVersion) -> CapabilitySet {
    let caps = CapabilitySet::negotiate(host.query_version(), minimum);

    match caps.outcome() {
        NegotiationOutcome::Accepted => {
            info!(version = %caps.version(), "host protocol version accepted")
        }
        NegotiationOutcome::ForwardCompatible => info!(
            version = %caps.version(),
            latest = %ProtocolVersion::DRIVER_LATEST,
            "host protocol version is newer than this driver; continuing"
        ),
        NegotiationOutcome::BelowMinimum => warn!(
            version = %caps.version(),
            minimum = %minimum,
            "protocol version mismatch; continuing with degraded capabilities"
        ),
        NegotiationOutcome::QueryFailed(status) => warn!(
            %status,
            "host version query failed; continuing with degraded capabilities"
        ),
    }
    caps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::adapter::MockHostRuntime;
    use idd_core::{HostCapabilityFlags, HostStatus, HostVersionInfo};

    fn host_reporting(result: Result<HostVersionInfo, HostStatus>) -> MockHostRuntime {
        let mut host = MockHostRuntime::new();
        host.expect_query_version().times(1).return_const(result);
        host
    }

    #[test]
    fn test_host_at_latest_version_is_accepted_with_physical_size() {
        let host = host_reporting(Ok(HostVersionInfo {
            version: ProtocolVersion(0x0002_0004),
            flags: HostCapabilityFlags::NONE,
        }));

        let caps = negotiate_version(&host, ProtocolVersion::DRIVER_MINIMUM);

        assert_eq!(caps.version(), ProtocolVersion(0x0002_0004));
        assert_eq!(caps.outcome(), NegotiationOutcome::Accepted);
        assert!(caps.supports_physical_size());
    }

    #[test]
    fn test_older_host_degrades_but_keeps_reported_version() {
        let host = host_reporting(Ok(HostVersionInfo {
            version: ProtocolVersion(0x0001_0009),
            flags: HostCapabilityFlags::NONE,
        }));

        let caps = negotiate_version(&host, ProtocolVersion::DRIVER_MINIMUM);

        assert_eq!(caps.version(), ProtocolVersion(0x0001_0009));
        assert!(!caps.outcome().is_ok());
        assert!(caps.is_degraded());
        assert!(!caps.supports_physical_size());
    }

    #[test]
    fn test_failed_query_is_degraded_not_fatal() {
        let host = host_reporting(Err(HostStatus::NOT_SUPPORTED));

        let caps = negotiate_version(&host, ProtocolVersion::DRIVER_MINIMUM);

        assert_eq!(
            caps.outcome(),
            NegotiationOutcome::QueryFailed(HostStatus::NOT_SUPPORTED)
        );
        assert_eq!(caps.version(), ProtocolVersion::UNKNOWN);
    }
}
