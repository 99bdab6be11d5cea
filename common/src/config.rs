use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Upper bound on concurrent probe workers.
///
/// More workers only add redundant broadcast traffic on one segment.
pub const MAX_WORKERS: usize = 16;

/// How the orchestrator drives probes across the target range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Broadcast when every target is on the interface's own network, per-target otherwise.
    #[default]
    Auto,
    /// One shared listener, every pending request sent back to back per attempt.
    Broadcast,
    /// A worker pool probing one target at a time with independent retry.
    PerTarget,
}

/// What to do when a second reply arrives for an IP that is already bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep the first binding, drop and log later ones.
    #[default]
    KeepFirst,
    /// Replace the hardware address, tracking address reassignment.
    KeepLatest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Collection window for one probe cycle.
    pub per_target_timeout: Duration,
    /// Explicit interface name; `None` picks the first usable one.
    pub interface: Option<String>,
    /// Extra attempts for targets that timed out.
    pub retries: u32,
    pub mode: ScanMode,
    /// Worker pool size in per-target mode, clamped to `1..=MAX_WORKERS`.
    pub workers: usize,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            per_target_timeout: DEFAULT_TIMEOUT,
            interface: None,
            retries: 0,
            mode: ScanMode::Auto,
            workers: default_workers(),
            duplicate_policy: DuplicatePolicy::KeepFirst,
        }
    }
}

impl ScanConfig {
    /// Pool size actually used for `targets` addresses.
    pub fn effective_workers(&self, targets: usize) -> usize {
        self.workers.clamp(1, MAX_WORKERS).min(targets.max(1))
    }

    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_WORKERS)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
