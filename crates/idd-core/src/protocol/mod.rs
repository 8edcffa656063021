//! Vocabulary shared with the host display runtime.
//!
//! - [`version`]: protocol versions, host capability flags, and the
//!   negotiated [`version::CapabilitySet`].
//! - [`status`]: the host's success/failure status code catalogue.
//! - [`handles`]: typed opaque tokens for host objects.

pub mod handles;
pub mod status;
pub mod version;
