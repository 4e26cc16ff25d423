use retsnoop_engine::CallStack;
use retsnoop_fntable::{errno_of, ErrorMask, FuncFlags, FuncTable};

use crate::format::comm_str;
use crate::reconcile::stitch_is_adjacent;

// FILTER CONFIGURATION
// ================================================================================================

/// User-configured thresholds applied to every dequeued [`CallStack`] before it is rendered
/// (SPEC_FULL.md §4.5 steps 1-2).
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// `-S`: emit successful stacks too, not just failing ones.
    pub report_successes: bool,
    /// `-L`: discard stacks whose total latency is below this threshold.
    pub longer_than_ms: u64,
    pub allow_mask: ErrorMask,
    pub deny_mask: ErrorMask,
    /// `-p`: when non-empty, only these process ids pass.
    pub allow_pid: Vec<u32>,
    /// `-P`: these process ids never pass, regardless of `allow_pid`.
    pub deny_pid: Vec<u32>,
    /// `-n`: when non-empty, only these process names pass.
    pub allow_comm: Vec<String>,
    /// `-N`: these process names never pass, regardless of `allow_comm`.
    pub deny_comm: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            report_successes: false,
            longer_than_ms: 0,
            allow_mask: ErrorMask::all(),
            deny_mask: ErrorMask::none(),
            allow_pid: Vec::new(),
            deny_pid: Vec::new(),
            allow_comm: Vec::new(),
            deny_comm: Vec::new(),
        }
    }
}

impl FilterConfig {
    fn masks_are_default(&self) -> bool {
        self.allow_mask.is_default_allow_all() && self.deny_mask.is_default_empty()
    }

    /// `-p`/`-P`/`-n`/`-N`: whether `pid`/`comm` survive the process allow/deny lists (SPEC_FULL.md
    /// §6's "Allow/deny process id"/"Allow/deny process name").
    fn process_allowed(&self, pid: u32, comm: &[u8]) -> bool {
        if self.deny_pid.contains(&pid) {
            return false;
        }
        if !self.allow_pid.is_empty() && !self.allow_pid.contains(&pid) {
            return false;
        }
        let name = comm_str(comm);
        if self.deny_comm.iter().any(|n| n == &name) {
            return false;
        }
        if !self.allow_comm.is_empty() && !self.allow_comm.iter().any(|n| n == &name) {
            return false;
        }
        true
    }
}

/// Nanoseconds to milliseconds, truncating (the duration thresholds are specified in whole ms).
fn ns_to_ms(ns: u64) -> u64 {
    ns / 1_000_000
}

/// Errno a frame's return value maps to, if its flags permit one (`CANT_FAIL` frames never do).
fn frame_errno(flags: FuncFlags, ret: u64) -> Option<u16> {
    if flags.contains(FuncFlags::CANT_FAIL) {
        return None;
    }
    errno_of(ret, flags.contains(FuncFlags::NEEDS_SIGN_EXT))
}

/// Decides whether `record` survives the report gate and error filter, implementing SPEC_FULL.md
/// §4.5 steps 1-2 (invariants 6 and 7 in §8).
pub fn passes_filter(record: &CallStack, table: &FuncTable, cfg: &FilterConfig) -> bool {
    if !cfg.process_allowed(record.pid, &record.comm) {
        return false;
    }
    if !cfg.report_successes && !record.is_err {
        return false;
    }
    if record.max_depth > 0 && ns_to_ms(record.func_lat[0]) < cfg.longer_than_ms {
        return false;
    }
    if cfg.masks_are_default() {
        return true;
    }

    let include_stitched = stitch_is_adjacent(record);

    let mut any_allow = false;
    for d in 0..record.max_depth {
        let flags = table.flags(record.func_ids[d]);
        if let Some(errno) = frame_errno(flags, record.func_res[d]) {
            if cfg.deny_mask.contains(errno) {
                return false;
            }
            if cfg.allow_mask.contains(errno) {
                any_allow = true;
            }
        }
    }
    if include_stitched {
        for d in (record.saved_depth - 1)..record.saved_max_depth {
            let flags = table.flags(record.saved_ids[d]);
            if let Some(errno) = frame_errno(flags, record.saved_res[d]) {
                if cfg.deny_mask.contains(errno) {
                    return false;
                }
                if cfg.allow_mask.contains(errno) {
                    any_allow = true;
                }
            }
        }
    }

    any_allow
}
