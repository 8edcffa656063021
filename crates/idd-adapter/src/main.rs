//! `idd-sim`: drives the indirect display driver against a simulated host.
//!
//! The simulator plays the part of the host display runtime and walks the
//! driver through one full lifecycle:
//!
//! ```text
//! main()
//!  └─ load config (TOML)           -- adapter name, monitors, mode limits
//!  └─ SimulatedHost::new(version)  -- the "operating system"
//!  └─ ChannelRenderer + drain task -- consumes swap-chain events
//!  └─ lifecycle
//!       ├─ device add / power on / adapter init finished
//!       ├─ commit the preferred mode of every monitor
//!       ├─ assign a swap chain and push N frames per monitor
//!       ├─ unplug the first monitor (forces its swap chain off)
//!       └─ cleanup
//! ```
//!
//! # Running it (for beginners)
//!
//! ```text
//! cargo run -p idd-adapter --bin idd-sim -- --frames 10
//! cargo run -p idd-adapter --bin idd-sim -- --host-version 0x00010003
//! RUST_LOG=debug cargo run -p idd-adapter --bin idd-sim
//! ```
//!
//! The second form simulates a host older than the driver minimum: device
//! add still succeeds, but the physical-size query is not registered.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use idd_adapter::application::adapter::DevicePowerState;
use idd_adapter::application::dispatch::{IndirectDisplayCallbacks, IndirectDisplayDriver};
use idd_adapter::application::negotiate_modes::ModeAssignment;
use idd_adapter::application::swap_chain::RenderingParams;
use idd_adapter::infrastructure::host::{HostCall, SimulatedHost};
use idd_adapter::infrastructure::renderer::{ChannelRenderer, RendererEvent};
use idd_adapter::infrastructure::storage::config;
use idd_core::{DeviceInitHandle, FrameToken, HostStatus, ProtocolVersion, SwapChainHandle};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Indirect display driver simulator.
#[derive(Debug, Parser)]
#[command(
    name = "idd-sim",
    about = "Runs the virtual display adapter lifecycle against a simulated host",
    version
)]
struct Cli {
    /// Path to the driver configuration file.  Defaults to the platform
    /// config directory; a missing file means built-in defaults.
    #[arg(long, env = "IDD_CONFIG")]
    config: Option<PathBuf>,

    /// Protocol version the simulated host reports, e.g. `0x00020004`.
    #[arg(long, default_value = "0x00020004", value_parser = parse_version)]
    host_version: ProtocolVersion,

    /// Frames presented on each monitor before teardown.
    #[arg(long, default_value_t = 5)]
    frames: u64,
}

/// Parses a protocol version written in hex (`0x...`) or decimal.
fn parse_version(s: &str) -> Result<ProtocolVersion, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed
        .map(ProtocolVersion)
        .map_err(|e| format!("invalid protocol version '{s}': {e}"))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let driver_config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
    .context("failed to load driver configuration")?;

    // `RUST_LOG` wins; otherwise the level from the config file applies.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&driver_config.driver.log_level)),
        )
        .init();

    let adapter_config = driver_config
        .to_adapter_config()
        .context("invalid driver configuration")?;
    info!(
        host_version = %cli.host_version,
        monitors = adapter_config.monitors.len(),
        "idd-sim starting"
    );

    // ── Renderer drain task ───────────────────────────────────────────────────
    let (renderer, mut events) = ChannelRenderer::new();
    let drain = tokio::spawn(async move {
        let mut frames = 0u64;
        while let Some(event) = events.recv().await {
            match event {
                RendererEvent::Assigned(a) => info!(
                    monitor = %a.monitor,
                    swap_chain = %a.handle,
                    mode = %a.mode,
                    "renderer: swap chain assigned"
                ),
                RendererEvent::FrameAvailable { .. } => frames += 1,
                RendererEvent::Unassigned(monitor) => {
                    info!(%monitor, "renderer: swap chain unassigned")
                }
            }
        }
        frames
    });

    let host = Arc::new(SimulatedHost::new(cli.host_version));
    let driver = IndirectDisplayDriver::new(adapter_config, host.clone(), Arc::new(renderer));

    run_lifecycle(&driver, cli.frames)?;
    drop(driver);

    let rendered = drain.await.context("renderer drain task failed")?;
    info!(
        frames = rendered,
        host_calls = host.calls().len(),
        departures = host.count(|c| matches!(c, HostCall::MonitorDeparture(_))),
        "idd-sim finished"
    );
    Ok(())
}

/// Plays the host side of one adapter lifetime.
fn run_lifecycle(driver: &IndirectDisplayDriver, frames: u64) -> anyhow::Result<()> {
    let status = driver.device_add(DeviceInitHandle(1));
    if !status.is_success() {
        bail!("device add failed: {status}");
    }
    let status = driver.device_power_on(DevicePowerState::D3);
    if !status.is_success() {
        bail!("power on failed: {status}");
    }
    driver.adapter_init_finished(HostStatus::SUCCESS);

    let adapter = driver.adapter().context("adapter vanished after device add")?;
    let monitors = adapter.monitors();

    let assignments: Vec<ModeAssignment> = monitors
        .iter()
        .map(|m| ModeAssignment::active(m.id(), m.target_modes().default_mode()))
        .collect();
    let status = driver.adapter_commit_modes(&assignments);
    if !status.is_success() {
        bail!("mode commit failed: {status}");
    }

    let mut token = 0u64;
    for (index, monitor) in monitors.iter().enumerate() {
        let id = monitor.id();
        let status = driver.monitor_assign_swap_chain(
            id,
            SwapChainHandle(0x10 + index as u64),
            RenderingParams::default(),
        );
        if !status.is_success() {
            warn!(monitor = %id, %status, "swap chain assignment refused");
            continue;
        }
        for _ in 0..frames {
            token += 1;
            let status = driver.swap_chain_frame_available(id, FrameToken(token));
            if !status.is_success() {
                warn!(monitor = %id, %status, "frame refused");
                break;
            }
            driver.swap_chain_frame_released(id, FrameToken(token));
        }
        let size = match driver.physical_size_query() {
            Some(query) => driver.monitor_get_physical_size(query, id).ok(),
            None => None,
        };
        match size {
            Some(size) => info!(
                monitor = %id,
                width_mm = size.width_mm,
                height_mm = size.height_mm,
                presented = monitor.frames_presented(),
                "monitor summary"
            ),
            None => info!(
                monitor = %id,
                presented = monitor.frames_presented(),
                "monitor summary (no physical size)"
            ),
        }
    }

    if let Some(first) = monitors.first() {
        driver.unplug_monitor(first.id());
    }
    for monitor in monitors.iter().skip(1) {
        driver.monitor_unassign_swap_chain(monitor.id());
    }

    driver.device_cleanup();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
