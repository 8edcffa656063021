//! Domain values for the indirect display adapter.
//!
//! This module contains pure logic with no host runtime dependencies.
//!
//! # Why keep these types host-free? (for beginners)
//!
//! The host runtime is the hardest thing to test against: it only exists
//! inside the operating system's display stack.  Everything in `domain` can
//! be compiled and tested on any machine, so the rules that matter most
//! (which modes a monitor advertises, what happens to a malformed EDID) are
//! pinned down by ordinary unit tests.
//!
//! Code in the adapter crate depends on the domain, but the domain never
//! depends on the adapter.

/// Display modes and ordered mode lists.
///
/// See [`mode::ModeList`] for the main type.
pub mod mode;

/// Monitor description (EDID base block) parsing and synthesis.
pub mod description;
