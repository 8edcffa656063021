//! ModeNegotiationEngine: default modes, target modes, and atomic commits.
//!
//! # The three mode questions the host asks (for beginners)
//!
//! 1. *"Which modes does this monitor support?"*  Answered from the monitor
//!    description.  A description that cannot be parsed is not an error here:
//!    the monitor still gets the safe fallback set so it remains usable.
//! 2. *"Which modes may I actually drive on this monitor?"*  The target
//!    modes: the default modes filtered through the adapter's limits.
//! 3. *"Apply this combination of modes across all monitors."*  A commit.  A
//!    commit is all-or-nothing: every requested mode is validated before any
//!    monitor's committed mode changes, so the host never observes a partial
//!    configuration.  A path whose mode changes (or which is deactivated)
//!    loses its swap chain as part of the same commit: the host assigns a new
//!    one for the new mode.

use std::collections::HashSet;
use std::sync::Arc;

use idd_core::{parse_description, HostStatus, Mode, ModeLimits, ModeList, MonitorId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::monitor::MonitorContext;
use super::swap_chain::{SwapChainManager, UnassignOutcome};

/// One path of a commit request: the mode to drive on `monitor`, or `None`
/// when the path is being deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeAssignment {
    pub monitor: MonitorId,
    pub mode: Option<Mode>,
}

impl ModeAssignment {
    pub fn active(monitor: MonitorId, mode: Mode) -> Self {
        Self {
            monitor,
            mode: Some(mode),
        }
    }

    pub fn inactive(monitor: MonitorId) -> Self {
        Self {
            monitor,
            mode: None,
        }
    }
}

/// Reasons a commit is rejected.  A rejected commit changes nothing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("commit names unknown {0}")]
    UnknownMonitor(MonitorId),
    #[error("commit names {0} more than once")]
    DuplicateMonitor(MonitorId),
    #[error("{monitor} does not offer {requested}")]
    InvalidModeRequest { monitor: MonitorId, requested: Mode },
    #[error("{0} departed before the commit was applied")]
    MonitorDeparted(MonitorId),
}

impl CommitError {
    pub fn status(&self) -> HostStatus {
        match self {
            Self::UnknownMonitor(_) | Self::MonitorDeparted(_) => HostStatus::NOT_FOUND,
            Self::DuplicateMonitor(_) | Self::InvalidModeRequest { .. } => {
                HostStatus::INVALID_PARAMETER
            }
        }
    }
}

/// Modes and physical size derived from one monitor description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedMonitor {
    pub default_modes: ModeList,
    pub target_modes: ModeList,
    /// `None` when the description carried no size or did not parse.
    pub physical_size_mm: Option<(u32, u32)>,
    /// `true` when the description was unusable and the fallback set applied.
    pub used_fallback: bool,
}

/// Answers the host's mode questions for every monitor of one adapter.
#[derive(Debug, Clone)]
pub struct ModeNegotiationEngine {
    limits: ModeLimits,
}

impl ModeNegotiationEngine {
    pub fn new(limits: ModeLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ModeLimits {
        self.limits
    }

    /// Derives default and target modes from raw description bytes.
    pub fn describe(&self, description: &[u8]) -> DescribedMonitor {
        match parse_description(description) {
            Ok(parsed) => {
                debug!(
                    manufacturer = %parsed.manufacturer,
                    product = parsed.product_code,
                    modes = %parsed.modes,
                    "monitor description parsed"
                );
                DescribedMonitor {
                    target_modes: parsed.modes.filtered(&self.limits),
                    default_modes: parsed.modes,
                    physical_size_mm: parsed.physical_size_mm,
                    used_fallback: false,
                }
            }
            Err(e) => {
                warn!(error = %e, "unusable monitor description; using fallback modes");
                let fallback = ModeList::fallback();
                DescribedMonitor {
                    target_modes: fallback.filtered(&self.limits),
                    default_modes: fallback,
                    physical_size_mm: None,
                    used_fallback: true,
                }
            }
        }
    }

    /// Supported modes for a description, in preference order.  Never empty.
    pub fn default_modes(&self, description: &[u8]) -> ModeList {
        self.describe(description).default_modes
    }

    /// Modes offered to the host for `monitor`.  Always a subset of its
    /// default modes.
    pub fn query_target_modes(&self, monitor: &MonitorContext) -> ModeList {
        monitor.target_modes()
    }

    /// Applies `request` atomically.
    ///
    /// `lookup` resolves monitor ids against the adapter's current monitors.
    /// Monitors are locked in ascending id order so concurrent commits cannot
    /// deadlock.  Monitors not named in the request keep their committed mode.
    /// A monitor whose committed mode changes has its swap chain torn down
    /// through `swap_chains` while its lock is still held.
    ///
    /// # Errors
    ///
    /// Returns [`CommitError`] for the first problem found; no monitor's
    /// committed mode changes in that case.
    pub fn commit_modes<F>(
        &self,
        lookup: F,
        swap_chains: &SwapChainManager,
        request: &[ModeAssignment],
    ) -> Result<Vec<ModeAssignment>, CommitError>
    where
        F: Fn(MonitorId) -> Option<Arc<MonitorContext>>,
    {
        let mut seen = HashSet::with_capacity(request.len());
        let mut paths = Vec::with_capacity(request.len());
        for assignment in request {
            if !seen.insert(assignment.monitor) {
                warn!(monitor = %assignment.monitor, "commit rejected: duplicate monitor");
                return Err(CommitError::DuplicateMonitor(assignment.monitor));
            }
            let monitor = lookup(assignment.monitor).ok_or_else(|| {
                warn!(monitor = %assignment.monitor, "commit rejected: unknown monitor");
                CommitError::UnknownMonitor(assignment.monitor)
            })?;
            paths.push((monitor, assignment.mode));
        }
        paths.sort_by_key(|(monitor, _)| monitor.id());

        let mut guards: Vec<_> = paths.iter().map(|(monitor, _)| monitor.lock()).collect();

        // Validate everything before touching anything.
        let mut resolved = Vec::with_capacity(paths.len());
        for ((monitor, requested), state) in paths.iter().zip(guards.iter()) {
            if state.departed {
                warn!(monitor = %monitor.id(), "commit rejected: monitor departed");
                return Err(CommitError::MonitorDeparted(monitor.id()));
            }
            let mode = match requested {
                Some(requested) => match state.target_modes.find_timing(requested) {
                    Some(canonical) => Some(canonical),
                    None => {
                        warn!(
                            monitor = %monitor.id(),
                            %requested,
                            offered = %state.target_modes,
                            "commit rejected: mode not offered"
                        );
                        return Err(CommitError::InvalidModeRequest {
                            monitor: monitor.id(),
                            requested: *requested,
                        });
                    }
                },
                None => None,
            };
            resolved.push(mode);
        }

        let mut applied = Vec::with_capacity(paths.len());
        for (((monitor, _), state), mode) in paths.iter().zip(guards.iter_mut()).zip(resolved) {
            if state.committed != mode {
                if let UnassignOutcome::Released { handle, .. } =
                    swap_chains.release_locked(monitor.id(), state)
                {
                    info!(
                        monitor = %monitor.id(),
                        swap_chain = %handle,
                        "swap chain dropped: committed mode changed"
                    );
                }
            }
            state.committed = mode;
            applied.push(ModeAssignment {
                monitor: monitor.id(),
                mode,
            });
            match mode {
                Some(mode) => info!(
                    monitor = %monitor.id(),
                    %mode,
                    "mode committed; ready for swap chain assignment"
                ),
                None => info!(monitor = %monitor.id(), "path deactivated"),
            }
        }
        Ok(applied)
    }
}

impl Default for ModeNegotiationEngine {
    fn default() -> Self {
        Self::new(ModeLimits::UNLIMITED)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::swap_chain::RenderingParams;
    use crate::infrastructure::renderer::mock::RecordingRenderer;
    use crate::infrastructure::renderer::RendererEvent;
    use idd_core::{EdidBuilder, HostMonitorHandle, SwapChainHandle, FALLBACK_MODES};
    use uuid::Uuid;

    fn swap_chains() -> SwapChainManager {
        SwapChainManager::new(Arc::new(RecordingRenderer::new()))
    }

    fn monitor(id: u32, modes: &[Mode]) -> Arc<MonitorContext> {
        let list = ModeList::new(modes.iter().copied()).unwrap();
        Arc::new(MonitorContext::new(
            MonitorId(id),
            HostMonitorHandle(u64::from(id)),
            id,
            Uuid::nil(),
            (527, 296),
            list.clone(),
            list,
        ))
    }

    fn lookup_in(
        monitors: &[Arc<MonitorContext>],
    ) -> impl Fn(MonitorId) -> Option<Arc<MonitorContext>> + '_ {
        move |id| monitors.iter().find(|m| m.id() == id).cloned()
    }

    #[test]
    fn test_default_modes_from_valid_description() {
        let engine = ModeNegotiationEngine::default();
        let bytes = EdidBuilder::new([Mode::new(1920, 1080, 60), Mode::new(1280, 720, 60)])
            .build()
            .unwrap();

        let modes = engine.default_modes(&bytes);

        assert_eq!(
            modes.as_slice(),
            &[Mode::preferred(1920, 1080, 60), Mode::new(1280, 720, 60)]
        );
    }

    #[test]
    fn test_default_modes_from_empty_description_is_fallback() {
        let engine = ModeNegotiationEngine::default();

        let described = engine.describe(&[]);

        assert!(described.used_fallback);
        assert_eq!(described.default_modes.as_slice(), FALLBACK_MODES.as_slice());
        assert_eq!(described.physical_size_mm, None);
    }

    #[test]
    fn test_target_modes_respect_limits() {
        let engine = ModeNegotiationEngine::new(ModeLimits {
            max_width: 1920,
            max_height: 1080,
            max_refresh_hz: 60,
        });
        let bytes = EdidBuilder::new([Mode::new(3840, 2160, 60), Mode::new(1920, 1080, 60)])
            .build()
            .unwrap();

        let described = engine.describe(&bytes);

        assert_eq!(described.target_modes.as_slice(), &[Mode::new(1920, 1080, 60)]);
        assert!(described.target_modes.is_subset_of(&described.default_modes));
    }

    #[test]
    fn test_commit_offered_mode_stores_canonical_entry() {
        let engine = ModeNegotiationEngine::default();
        let monitors = vec![monitor(1, &[Mode::new(1920, 1080, 60), Mode::new(1280, 720, 60)])];

        let applied = engine
            .commit_modes(
                lookup_in(&monitors),
                &swap_chains(),
                &[ModeAssignment::active(MonitorId(1), Mode::new(1920, 1080, 60))],
            )
            .unwrap();

        // The stored mode carries the list's preferred flag.
        assert_eq!(monitors[0].committed_mode(), Some(Mode::preferred(1920, 1080, 60)));
        assert_eq!(applied.len(), 1);
    }

    #[test]
    fn test_commit_with_one_invalid_mode_changes_nothing() {
        // Arrange
        let engine = ModeNegotiationEngine::default();
        let monitors = vec![
            monitor(1, &[Mode::new(1920, 1080, 60)]),
            monitor(2, &[Mode::new(1280, 720, 60)]),
        ];
        engine
            .commit_modes(
                lookup_in(&monitors),
                &swap_chains(),
                &[ModeAssignment::active(MonitorId(2), Mode::new(1280, 720, 60))],
            )
            .unwrap();

        // Act
        let result = engine.commit_modes(
            lookup_in(&monitors),
            &swap_chains(),
            &[
                ModeAssignment::active(MonitorId(1), Mode::new(1920, 1080, 60)),
                ModeAssignment::active(MonitorId(2), Mode::new(3840, 2160, 60)),
            ],
        );

        // Assert
        assert_eq!(
            result,
            Err(CommitError::InvalidModeRequest {
                monitor: MonitorId(2),
                requested: Mode::new(3840, 2160, 60),
            })
        );
        assert_eq!(monitors[0].committed_mode(), None);
        assert_eq!(monitors[1].committed_mode(), Some(Mode::preferred(1280, 720, 60)));
    }

    #[test]
    fn test_commit_rejects_duplicate_and_unknown_monitors() {
        let engine = ModeNegotiationEngine::default();
        let monitors = vec![monitor(1, &[Mode::new(1920, 1080, 60)])];

        let duplicate = engine.commit_modes(
            lookup_in(&monitors),
            &swap_chains(),
            &[
                ModeAssignment::active(MonitorId(1), Mode::new(1920, 1080, 60)),
                ModeAssignment::inactive(MonitorId(1)),
            ],
        );
        let unknown = engine.commit_modes(
            lookup_in(&monitors),
            &swap_chains(),
            &[ModeAssignment::active(MonitorId(9), Mode::new(1920, 1080, 60))],
        );

        assert_eq!(duplicate, Err(CommitError::DuplicateMonitor(MonitorId(1))));
        assert_eq!(unknown, Err(CommitError::UnknownMonitor(MonitorId(9))));
        assert_eq!(unknown.unwrap_err().status(), HostStatus::NOT_FOUND);
        assert_eq!(monitors[0].committed_mode(), None);
    }

    #[test]
    fn test_commit_inactive_path_clears_committed_mode() {
        let engine = ModeNegotiationEngine::default();
        let monitors = vec![monitor(1, &[Mode::new(1920, 1080, 60)])];
        engine
            .commit_modes(
                lookup_in(&monitors),
                &swap_chains(),
                &[ModeAssignment::active(MonitorId(1), Mode::new(1920, 1080, 60))],
            )
            .unwrap();

        engine
            .commit_modes(lookup_in(&monitors),&swap_chains(), &[ModeAssignment::inactive(MonitorId(1))])
            .unwrap();

        assert_eq!(monitors[0].committed_mode(), None);
    }

    #[test]
    fn test_commit_deactivating_path_drops_its_swap_chain() {
        // Arrange
        let engine = ModeNegotiationEngine::default();
        let renderer = Arc::new(RecordingRenderer::new());
        let chains = SwapChainManager::new(renderer.clone());
        let monitors = vec![monitor(1, &[Mode::new(1024, 768, 60), Mode::new(800, 600, 60)])];
        engine
            .commit_modes(
                lookup_in(&monitors),
                &chains,
                &[ModeAssignment::active(MonitorId(1), Mode::new(1024, 768, 60))],
            )
            .unwrap();
        chains
            .assign(&monitors[0], SwapChainHandle(0x10), RenderingParams::default())
            .unwrap();

        // Act
        engine
            .commit_modes(lookup_in(&monitors), &chains, &[ModeAssignment::inactive(MonitorId(1))])
            .unwrap();

        // Assert
        assert_eq!(monitors[0].committed_mode(), None);
        assert_eq!(monitors[0].active_swap_chain(), None);
        assert_eq!(
            renderer.events().last(),
            Some(&RendererEvent::Unassigned(MonitorId(1)))
        );
    }

    #[test]
    fn test_commit_changing_mode_drops_swap_chain_but_same_mode_keeps_it() {
        // Arrange
        let engine = ModeNegotiationEngine::default();
        let chains = swap_chains();
        let monitors = vec![monitor(1, &[Mode::new(1024, 768, 60), Mode::new(800, 600, 60)])];
        let xga = [ModeAssignment::active(MonitorId(1), Mode::new(1024, 768, 60))];
        engine.commit_modes(lookup_in(&monitors), &chains, &xga).unwrap();
        chains
            .assign(&monitors[0], SwapChainHandle(0x10), RenderingParams::default())
            .unwrap();

        // Act – recommit the same mode, then switch to 800x600
        engine.commit_modes(lookup_in(&monitors), &chains, &xga).unwrap();
        let kept = monitors[0].active_swap_chain();
        engine
            .commit_modes(
                lookup_in(&monitors),
                &chains,
                &[ModeAssignment::active(MonitorId(1), Mode::new(800, 600, 60))],
            )
            .unwrap();

        // Assert
        assert_eq!(kept, Some(SwapChainHandle(0x10)));
        assert_eq!(monitors[0].active_swap_chain(), None);
        assert_eq!(monitors[0].committed_mode(), Some(Mode::new(800, 600, 60)));
    }

    #[test]
    fn test_commit_on_departed_monitor_is_rejected() {
        let engine = ModeNegotiationEngine::default();
        let monitors = vec![monitor(1, &[Mode::new(1920, 1080, 60)])];
        monitors[0].lock().departed = true;

        let result = engine.commit_modes(
            lookup_in(&monitors),
            &swap_chains(),
            &[ModeAssignment::active(MonitorId(1), Mode::new(1920, 1080, 60))],
        );

        assert_eq!(result, Err(CommitError::MonitorDeparted(MonitorId(1))));
    }

    #[test]
    fn test_empty_commit_is_accepted() {
        let engine = ModeNegotiationEngine::default();

        let applied = engine.commit_modes(|_| None, &swap_chains(), &[]).unwrap();

        assert!(applied.is_empty());
    }
}
