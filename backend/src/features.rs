use std::path::Path;

use tracing::debug;

// FEATURE DETECTOR
// ================================================================================================

/// Backend capability flags probed once at startup (SPEC_FULL.md §4.7). The planner and
/// transport select implementations based on these rather than hard-coding assumptions about the
/// running kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    /// A bounded lock-free ring-buffer transport is available (vs. the per-CPU perf-ring
    /// fallback named in SPEC_FULL.md §4.4).
    pub ring_buffer: bool,
    /// The backend can read a function's instruction pointer directly in the entry/exit probe.
    pub function_ip_helper: bool,
    /// Branch-stack (LBR) snapshots can be requested (SPEC_FULL.md §4.6).
    pub branch_snapshot: bool,
    /// Probes can carry a user-supplied cookie, used to pass the dense `FuncId` without a
    /// separate lookup.
    pub probe_cookies: bool,
    /// A single probe program can be attached to many functions at once (`-M` mode), rather
    /// than one program instance per function (`-K`).
    pub multi_attach: bool,
}

impl Features {
    /// Detects capabilities from the running kernel's feature-advertising files under `sysfs`.
    ///
    /// Each probe is independent and missing files are treated as "unsupported" rather than an
    /// error — a locked-down or minimal kernel should degrade, not abort.
    pub fn detect(sys_root: impl AsRef<Path>) -> Self {
        let sys_root = sys_root.as_ref();
        let features = Self {
            ring_buffer: sys_root.join("kernel/bpf_ringbuf").exists(),
            function_ip_helper: sys_root.join("kernel/bpf_get_func_ip").exists(),
            branch_snapshot: sys_root.join("bus/event_source/devices/cpu/caps/branches").exists(),
            probe_cookies: sys_root.join("kernel/bpf_cookie").exists(),
            multi_attach: sys_root.join("kernel/bpf_trampoline_multi").exists(),
        };
        debug!(?features, "detected backend capabilities");
        features
    }
}
