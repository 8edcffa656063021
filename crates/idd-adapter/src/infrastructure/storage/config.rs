//! TOML-based configuration for the indirect display driver.
//!
//! Reads and writes `DriverConfig` to the platform-appropriate config file:
//! - Windows:  `%ProgramData%\IndirectDisplay\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/indirect-display/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/IndirectDisplay/config.toml`
//!
//! # Example file
//!
//! ```toml
//! [driver]
//! log_level = "debug"
//! minimum_version = 0x00020000
//! io_control_enabled = true
//!
//! [adapter]
//! name = "Lab Adapter"
//! max_monitors = 2
//! default_physical_size_mm = [600, 340]
//!
//! [modes]
//! max_width = 2560
//! max_height = 1440
//! max_refresh_hz = 144
//!
//! [[monitors]]
//! name = "Left"
//! modes = [
//!     { width = 2560, height = 1440, refresh_hz = 60 },
//!     { width = 1920, height = 1080, refresh_hz = 60 },
//! ]
//! ```
//!
//! # Serde default values
//!
//! Every field has a `#[serde(default = "...")]` helper, so an empty file (or
//! no file at all) yields a working configuration with one 1080p monitor.
//! Leaving out `[[monitors]]` keeps that default monitor; writing
//! `monitors = []` starts the adapter with none.

use std::path::{Path, PathBuf};

use idd_core::{Mode, ModeLimits, ProtocolVersion, MAX_ENCODABLE_DIMENSION};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::adapter::{AdapterConfig, MonitorSpec};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The file parsed but describes an unusable adapter.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// A configured mode is zero-sized or too large for a monitor description.
    #[error("monitors[{monitor}] mode {mode} is out of range (1..={max} pixels per side, non-zero refresh)")]
    ModeOutOfRange { monitor: usize, mode: Mode, max: u32 },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level driver configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverConfig {
    #[serde(default)]
    pub driver: DriverSection,
    #[serde(default)]
    pub adapter: AdapterSection,
    #[serde(default)]
    pub modes: ModeLimitsSection,
    #[serde(default = "default_monitors")]
    pub monitors: Vec<MonitorEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverSection {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Lowest host protocol version treated as fully supported.
    #[serde(default = "default_minimum_version")]
    pub minimum_version: ProtocolVersion,
    /// Accept the IO-control plug/unplug/count requests.
    #[serde(default)]
    pub io_control_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdapterSection {
    #[serde(default = "default_adapter_name")]
    pub name: String,
    #[serde(default = "default_max_monitors")]
    pub max_monitors: u32,
    /// Size reported for monitors whose description carries none.
    #[serde(default = "default_physical_size_mm")]
    pub default_physical_size_mm: (u32, u32),
}

/// Upper bounds applied to every monitor's target modes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModeLimitsSection {
    #[serde(default = "default_max_dimension")]
    pub max_width: u32,
    #[serde(default = "default_max_dimension")]
    pub max_height: u32,
    #[serde(default = "default_max_refresh_hz")]
    pub max_refresh_hz: u32,
}

/// A monitor plugged automatically when the adapter finishes initializing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonitorEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_size_mm: Option<(u32, u32)>,
    /// Modes in preference order; the first becomes the preferred mode.
    pub modes: Vec<Mode>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_minimum_version() -> ProtocolVersion {
    ProtocolVersion::DRIVER_MINIMUM
}
fn default_adapter_name() -> String {
    "Virtual Indirect Display Adapter".to_string()
}
fn default_max_monitors() -> u32 {
    4
}
fn default_physical_size_mm() -> (u32, u32) {
    (527, 296)
}
fn default_max_dimension() -> u32 {
    ModeLimits::UNLIMITED.max_width
}
fn default_max_refresh_hz() -> u32 {
    ModeLimits::UNLIMITED.max_refresh_hz
}
fn default_monitors() -> Vec<MonitorEntry> {
    vec![MonitorEntry {
        name: Some("Virtual 1".to_string()),
        physical_size_mm: None,
        modes: vec![
            Mode::new(1920, 1080, 60),
            Mode::new(1280, 720, 60),
            Mode::new(1024, 768, 60),
        ],
    }]
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            driver: DriverSection::default(),
            adapter: AdapterSection::default(),
            modes: ModeLimitsSection::default(),
            monitors: default_monitors(),
        }
    }
}

impl Default for DriverSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            minimum_version: default_minimum_version(),
            io_control_enabled: false,
        }
    }
}

impl Default for AdapterSection {
    fn default() -> Self {
        Self {
            name: default_adapter_name(),
            max_monitors: default_max_monitors(),
            default_physical_size_mm: default_physical_size_mm(),
        }
    }
}

impl Default for ModeLimitsSection {
    fn default() -> Self {
        Self {
            max_width: default_max_dimension(),
            max_height: default_max_dimension(),
            max_refresh_hz: default_max_refresh_hz(),
        }
    }
}

impl DriverConfig {
    /// Validates the file contents and converts them into the adapter's
    /// runtime settings.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] when the adapter allows no monitors, more
    /// monitors are configured than allowed, a monitor lists no modes, or a
    /// mode limit is zero.  [`ConfigError::ModeOutOfRange`] when a monitor
    /// mode has a zero field or a side longer than a description can carry.
    pub fn to_adapter_config(&self) -> Result<AdapterConfig, ConfigError> {
        if self.adapter.max_monitors == 0 {
            return Err(ConfigError::Invalid(
                "adapter.max_monitors must be at least 1".to_string(),
            ));
        }
        if self.monitors.len() > self.adapter.max_monitors as usize {
            return Err(ConfigError::Invalid(format!(
                "{} monitors configured but adapter.max_monitors is {}",
                self.monitors.len(),
                self.adapter.max_monitors
            )));
        }
        if let Some(index) = self.monitors.iter().position(|m| m.modes.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "monitors[{index}] lists no modes"
            )));
        }
        for (monitor, entry) in self.monitors.iter().enumerate() {
            let out_of_range = |m: &&Mode| {
                !m.is_valid()
                    || m.width > MAX_ENCODABLE_DIMENSION
                    || m.height > MAX_ENCODABLE_DIMENSION
            };
            if let Some(mode) = entry.modes.iter().find(out_of_range) {
                return Err(ConfigError::ModeOutOfRange {
                    monitor,
                    mode: *mode,
                    max: MAX_ENCODABLE_DIMENSION,
                });
            }
        }
        let limits = ModeLimits {
            max_width: self.modes.max_width,
            max_height: self.modes.max_height,
            max_refresh_hz: self.modes.max_refresh_hz,
        };
        if limits.max_width == 0 || limits.max_height == 0 || limits.max_refresh_hz == 0 {
            return Err(ConfigError::Invalid(
                "mode limits must be non-zero".to_string(),
            ));
        }

        Ok(AdapterConfig {
            name: self.adapter.name.clone(),
            minimum_version: self.driver.minimum_version,
            max_monitors: self.adapter.max_monitors,
            io_control_enabled: self.driver.io_control_enabled,
            mode_limits: limits,
            default_physical_size_mm: self.adapter.default_physical_size_mm,
            monitors: self
                .monitors
                .iter()
                .map(|m| MonitorSpec {
                    modes: m.modes.clone(),
                    physical_size_mm: m.physical_size_mm,
                    name: m.name.clone(),
                })
                .collect(),
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `DriverConfig` from the platform config file, returning the
/// defaults if the file does not exist yet.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<DriverConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `DriverConfig` from `path`, returning the defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<DriverConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DriverConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &DriverConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory, including the application
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // Machine-wide: the driver host does not run as an interactive user.
        std::env::var_os("ProgramData").map(|p| PathBuf::from(p).join("IndirectDisplay"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("indirect-display"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("IndirectDisplay")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_driver_config_default_has_one_monitor_and_io_disabled() {
        let cfg = DriverConfig::default();

        assert_eq!(cfg.monitors.len(), 1);
        assert!(!cfg.driver.io_control_enabled);
        assert_eq!(cfg.driver.log_level, "info");
        assert_eq!(cfg.driver.minimum_version, ProtocolVersion::DRIVER_MINIMUM);
    }

    #[test]
    fn test_default_config_converts_to_adapter_config() {
        let adapter = DriverConfig::default().to_adapter_config().unwrap();

        assert_eq!(adapter.max_monitors, 4);
        assert_eq!(adapter.mode_limits, ModeLimits::UNLIMITED);
        assert_eq!(adapter.monitors[0].modes[0], Mode::new(1920, 1080, 60));
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: DriverConfig = toml::from_str("").expect("deserialize empty");

        assert_eq!(cfg, DriverConfig::default());
    }

    #[test]
    fn test_deserialize_full_example() {
        // Arrange
        let toml_str = r#"
[driver]
log_level = "debug"
minimum_version = 0x00020002
io_control_enabled = true

[adapter]
name = "Lab Adapter"
max_monitors = 2
default_physical_size_mm = [600, 340]

[modes]
max_width = 2560
max_height = 1440
max_refresh_hz = 144

[[monitors]]
name = "Left"
modes = [
    { width = 2560, height = 1440, refresh_hz = 60 },
    { width = 1920, height = 1080, refresh_hz = 60 },
]
physical_size_mm = [597, 336]
"#;

        // Act
        let cfg: DriverConfig = toml::from_str(toml_str).expect("deserialize");
        let adapter = cfg.to_adapter_config().expect("valid");

        // Assert
        assert_eq!(cfg.driver.minimum_version, ProtocolVersion(0x0002_0002));
        assert!(adapter.io_control_enabled);
        assert_eq!(adapter.default_physical_size_mm, (600, 340));
        assert_eq!(adapter.mode_limits.max_refresh_hz, 144);
        assert_eq!(adapter.monitors.len(), 1);
        assert_eq!(adapter.monitors[0].physical_size_mm, Some((597, 336)));
        assert_eq!(adapter.monitors[0].name.as_deref(), Some("Left"));
    }

    #[test]
    fn test_explicit_empty_monitor_list_is_kept() {
        let cfg: DriverConfig = toml::from_str("monitors = []").expect("deserialize");

        assert!(cfg.monitors.is_empty());
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let result: Result<DriverConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");

        assert!(result.is_err());
    }

    // ── Validation ────────────────────────────────────────────────────────────

    #[test]
    fn test_zero_max_monitors_is_invalid() {
        let mut cfg = DriverConfig::default();
        cfg.adapter.max_monitors = 0;

        assert!(matches!(cfg.to_adapter_config(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_more_monitors_than_allowed_is_invalid() {
        let mut cfg = DriverConfig::default();
        cfg.adapter.max_monitors = 1;
        cfg.monitors.push(cfg.monitors[0].clone());

        assert!(matches!(cfg.to_adapter_config(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_monitor_without_modes_is_invalid() {
        let mut cfg = DriverConfig::default();
        cfg.monitors[0].modes.clear();

        let err = cfg.to_adapter_config().unwrap_err();

        assert!(err.to_string().contains("monitors[0]"));
    }

    #[test]
    fn test_mode_taller_than_a_description_can_carry_is_rejected() {
        // Arrange
        let mut cfg = DriverConfig::default();
        cfg.monitors[0].modes.push(Mode::new(1280, 0x1000_0000, 60));

        // Act
        let result = cfg.to_adapter_config();

        // Assert
        assert!(matches!(
            result,
            Err(ConfigError::ModeOutOfRange { monitor: 0, mode, .. })
                if mode == Mode::new(1280, 0x1000_0000, 60)
        ));
    }

    #[test]
    fn test_mode_with_zero_refresh_is_rejected() {
        let mut cfg = DriverConfig::default();
        cfg.monitors[0].modes[1] = Mode::new(1280, 720, 0);

        assert!(matches!(
            cfg.to_adapter_config(),
            Err(ConfigError::ModeOutOfRange { monitor: 0, .. })
        ));
    }

    // ── File round-trip ──────────────────────────────────────────────────────

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");

        let cfg = load_config_from(&path).expect("missing file is not an error");

        assert_eq!(cfg, DriverConfig::default());
    }

    #[test]
    fn test_save_and_load_config_round_trip_via_temp_dir() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("idd_test_{}", Uuid::new_v4()));
        let path = dir.join("nested").join("config.toml");
        let mut cfg = DriverConfig::default();
        cfg.driver.log_level = "debug".to_string();
        cfg.adapter.max_monitors = 3;
        cfg.monitors[0].physical_size_mm = Some((600, 340));

        // Act
        save_config_to(&cfg, &path).expect("save");
        let loaded = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("config.toml"),
                "config file must be named config.toml, got {path:?}"
            );
        }
    }
}
