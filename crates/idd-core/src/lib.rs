//! # idd-core
//!
//! Shared library for the indirect display adapter containing display mode
//! values, the monitor description (EDID) parser, and the small vocabulary of
//! host protocol types: versions, status codes, and opaque handles.
//!
//! It has zero dependencies on the host runtime, renderer, or OS APIs.
//!
//! # Architecture overview (for beginners)
//!
//! An *indirect display* is a monitor that exists only in software.  The host
//! display stack believes a monitor is plugged in, asks it which resolutions
//! it supports, picks one, and then hands the driver a *swap chain* through
//! which rendered frames arrive.  Nothing is ever scanned out to real
//! hardware; a renderer decides what to do with the frames.
//!
//! This crate (`idd-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Pure values with no host dependencies: [`Mode`] (a
//!   resolution plus refresh rate), [`ModeList`] (an ordered, never-empty list
//!   of modes), and the monitor description parser that turns raw EDID bytes
//!   into a mode list.
//!
//! - **`protocol`** – The vocabulary shared with the host runtime: negotiated
//!   [`ProtocolVersion`]s and the resulting [`CapabilitySet`], the
//!   [`HostStatus`] code catalogue, and typed opaque handles such as
//!   [`SwapChainHandle`] and [`MonitorId`].

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `idd_core::Mode` instead of `idd_core::domain::mode::Mode`.
pub use domain::description::{
    parse_description, DescriptionParseError, EdidBuildError, EdidBuilder, MonitorDescription,
    MAX_ENCODABLE_DIMENSION,
};
pub use domain::mode::{Mode, ModeLimits, ModeList, ModeListError, FALLBACK_MODES};
pub use protocol::handles::{
    DeviceHandle, DeviceInitHandle, FrameToken, HostMonitorHandle, MonitorId,
    MonitorIdAllocator, SwapChainHandle, GUID_DEVINTERFACE_INDIRECT_DEVICE,
};
pub use protocol::status::HostStatus;
pub use protocol::version::{
    CapabilitySet, HostCapabilityFlags, HostVersionInfo, NegotiationOutcome, ProtocolVersion,
};
