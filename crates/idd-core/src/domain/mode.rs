//! Display modes and ordered, never-empty mode lists.
//!
//! A [`Mode`] is the smallest unit the host and the driver negotiate over: a
//! resolution plus a refresh rate.  Every monitor advertises a [`ModeList`]
//! in descending preference order, and the first entry is the monitor's
//! default (preferred) mode.
//!
//! Mode lists are immutable once built.  When a monitor's list changes the
//! whole list is replaced, so a reader holding a clone never observes a
//! half-updated list.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The driver-defined safe mode set used whenever a monitor description
/// cannot be parsed.  Never empty; the first entry is preferred.
pub const FALLBACK_MODES: [Mode; 3] = [
    Mode::preferred(1024, 768, 60),
    Mode::new(800, 600, 60),
    Mode::new(640, 480, 60),
];

/// A resolution / refresh-rate combination a monitor can present.
///
/// Equality is by field value.  Use [`Mode::same_timing`] to compare two
/// modes while ignoring the `preferred` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mode {
    /// Horizontal resolution in pixels.
    pub width: u32,
    /// Vertical resolution in pixels.
    pub height: u32,
    /// Vertical refresh rate in whole hertz.
    pub refresh_hz: u32,
    /// `true` for the monitor's default mode.
    #[serde(default)]
    pub preferred: bool,
}

impl Mode {
    /// Creates a non-preferred mode.
    pub const fn new(width: u32, height: u32, refresh_hz: u32) -> Self {
        Self {
            width,
            height,
            refresh_hz,
            preferred: false,
        }
    }

    /// Creates a mode marked as preferred.
    pub const fn preferred(width: u32, height: u32, refresh_hz: u32) -> Self {
        Self {
            width,
            height,
            refresh_hz,
            preferred: true,
        }
    }

    /// Returns a copy with the `preferred` marker set to `preferred`.
    pub const fn with_preferred(self, preferred: bool) -> Self {
        Self { preferred, ..self }
    }

    /// Returns `true` if both modes have the same width, height, and refresh.
    pub fn same_timing(&self, other: &Mode) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.refresh_hz == other.refresh_hz
    }

    /// Returns `true` if every field is non-zero.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.refresh_hz > 0
    }

    /// Number of pixels per frame.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{}", self.width, self.height, self.refresh_hz)?;
        if self.preferred {
            write!(f, " (preferred)")?;
        }
        Ok(())
    }
}

/// Errors that can occur when building a [`ModeList`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModeListError {
    /// No modes were supplied.
    #[error("mode list must contain at least one mode")]
    Empty,

    /// A mode has a zero width, height, or refresh rate.
    #[error("invalid mode {0}: width, height and refresh must be non-zero")]
    InvalidMode(Mode),
}

/// Upper bounds applied when deriving a monitor's target modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub max_refresh_hz: u32,
}

impl ModeLimits {
    /// Limits that admit every mode.
    pub const UNLIMITED: ModeLimits = ModeLimits {
        max_width: u32::MAX,
        max_height: u32::MAX,
        max_refresh_hz: u32::MAX,
    };

    /// Returns `true` if `mode` fits inside these limits.
    pub fn admits(&self, mode: &Mode) -> bool {
        mode.width <= self.max_width
            && mode.height <= self.max_height
            && mode.refresh_hz <= self.max_refresh_hz
    }
}

impl Default for ModeLimits {
    fn default() -> Self {
        Self::UNLIMITED
    }
}

/// An ordered, immutable, never-empty list of modes.
///
/// Cloning is cheap (the modes live behind an `Arc`), which lets a monitor
/// hand out snapshots of its list while holding its lock only briefly.
///
/// # Normalisation
///
/// [`ModeList::new`] keeps the first occurrence of each timing, drops later
/// duplicates, marks the first entry preferred and clears the marker on every
/// other entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeList {
    modes: Arc<[Mode]>,
}

impl ModeList {
    /// Builds a normalised mode list.
    ///
    /// # Errors
    ///
    /// Returns [`ModeListError::Empty`] if no modes are supplied and
    /// [`ModeListError::InvalidMode`] for a mode with a zero field.
    pub fn new(modes: impl IntoIterator<Item = Mode>) -> Result<Self, ModeListError> {
        let mut normalised: Vec<Mode> = Vec::new();
        for mode in modes {
            if !mode.is_valid() {
                return Err(ModeListError::InvalidMode(mode));
            }
            if normalised.iter().any(|m| m.same_timing(&mode)) {
                continue;
            }
            let preferred = normalised.is_empty();
            normalised.push(mode.with_preferred(preferred));
        }

        if normalised.is_empty() {
            return Err(ModeListError::Empty);
        }
        Ok(Self {
            modes: normalised.into(),
        })
    }

    /// The driver-defined safe mode set ([`FALLBACK_MODES`]).
    pub fn fallback() -> Self {
        Self {
            modes: Arc::from(FALLBACK_MODES.as_slice()),
        }
    }

    /// The default (first, preferred) mode.
    pub fn default_mode(&self) -> Mode {
        // Non-empty by construction.
        self.modes[0]
    }

    /// Returns the list entry with the same timing as `mode`, if any.
    pub fn find_timing(&self, mode: &Mode) -> Option<Mode> {
        self.modes.iter().copied().find(|m| m.same_timing(mode))
    }

    /// Returns `true` if a mode with the same timing as `mode` is present.
    pub fn contains_timing(&self, mode: &Mode) -> bool {
        self.find_timing(mode).is_some()
    }

    /// Returns the sub-list admitted by `limits`, preserving order and
    /// preferred markers.
    ///
    /// If the limits reject every mode the default mode alone is returned, so
    /// the result is never empty and is always a subset of `self`.
    pub fn filtered(&self, limits: &ModeLimits) -> ModeList {
        let admitted: Vec<Mode> = self
            .modes
            .iter()
            .copied()
            .filter(|m| limits.admits(m))
            .collect();

        if admitted.is_empty() {
            return Self {
                modes: Arc::from([self.default_mode()].as_slice()),
            };
        }
        Self {
            modes: admitted.into(),
        }
    }

    /// Returns `true` if every mode of `self` has a same-timing entry in `other`.
    pub fn is_subset_of(&self, other: &ModeList) -> bool {
        self.modes.iter().all(|m| other.contains_timing(m))
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    /// Always `false`; present for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mode> {
        self.modes.iter()
    }

    pub fn as_slice(&self) -> &[Mode] {
        &self.modes
    }

    pub fn to_vec(&self) -> Vec<Mode> {
        self.modes.to_vec()
    }
}

impl fmt::Display for ModeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.modes.iter().map(Mode::to_string).collect();
        write!(f, "[{}]", rendered.join(", "))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
