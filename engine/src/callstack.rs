use retsnoop_fntable::FuncId;

// SIZE LIMITS
// ================================================================================================

/// Deepest logical call chain the engine tracks. Entries past this depth are ignored, not
/// truncated-and-kept, matching SPEC_FULL.md §4.3.1 ("overflow ignored").
pub const MAX_FSTACK_DEPTH: usize = 64;
/// Deepest native kernel stack a single snapshot can hold.
pub const MAX_KSTACK_DEPTH: usize = 127;
/// Widest Last-Branch-Record ring the backend can report in one snapshot (matches typical Intel
/// LBR hardware depth).
pub const MAX_LBR_DEPTH: usize = 32;
/// `comm` is a short, NUL-padded process name, matching the kernel's own `TASK_COMM_LEN`.
pub const COMM_LEN: usize = 16;

/// One `(from, to)` branch recorded by the LBR hardware at the moment of a failing return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BranchSample {
    pub from: u64,
    pub to: u64,
}

// CALL STACK
// ================================================================================================

/// Fixed-capacity, per-CPU logical-stack record.
///
/// Owned exclusively by the probe-side handlers pinned to one CPU (SPEC_FULL.md §3
/// "Ownership"); the user side only ever sees a snapshot taken at emission time, never this
/// struct directly.
#[derive(Debug, Clone)]
pub struct CallStack {
    pub cpu: u32,

    pub depth: usize,
    pub max_depth: usize,
    pub func_ids: [FuncId; MAX_FSTACK_DEPTH],
    pub func_res: [u64; MAX_FSTACK_DEPTH],
    /// At entry: start timestamp (ns, monotonic). At exit: converted in place to a duration.
    pub func_lat: [u64; MAX_FSTACK_DEPTH],
    pub is_err: bool,

    pub kstack: [u64; MAX_KSTACK_DEPTH],
    pub kstack_sz: usize,

    pub lbrs: [BranchSample; MAX_LBR_DEPTH],
    pub lbrs_sz: usize,

    pub saved_ids: [FuncId; MAX_FSTACK_DEPTH],
    pub saved_res: [u64; MAX_FSTACK_DEPTH],
    pub saved_lat: [u64; MAX_FSTACK_DEPTH],
    pub saved_depth: usize,
    pub saved_max_depth: usize,

    pub pid: u32,
    pub tgid: u32,
    pub comm: [u8; COMM_LEN],

    pub emit_ts: u64,
}

impl CallStack {
    pub fn new(cpu: u32) -> Self {
        Self {
            cpu,
            depth: 0,
            max_depth: 0,
            func_ids: [0; MAX_FSTACK_DEPTH],
            func_res: [0; MAX_FSTACK_DEPTH],
            func_lat: [0; MAX_FSTACK_DEPTH],
            is_err: false,
            kstack: [0; MAX_KSTACK_DEPTH],
            kstack_sz: 0,
            lbrs: [BranchSample::default(); MAX_LBR_DEPTH],
            lbrs_sz: 0,
            saved_ids: [0; MAX_FSTACK_DEPTH],
            saved_res: [0; MAX_FSTACK_DEPTH],
            saved_lat: [0; MAX_FSTACK_DEPTH],
            saved_depth: 0,
            saved_max_depth: 0,
            pid: 0,
            tgid: 0,
            comm: [0; COMM_LEN],
            emit_ts: 0,
        }
    }

    /// Invariant 1: `0 <= depth <= max_depth <= MAX_FSTACK_DEPTH`, checked wherever tests want to
    /// assert the engine never drifted into an invalid state.
    pub fn check_invariants(&self) -> bool {
        self.depth <= self.max_depth && self.max_depth <= MAX_FSTACK_DEPTH
    }

    /// Copies the live `[func_ids/res/lat]` prefix into the stitch slot, as described in
    /// SPEC_FULL.md §4.3.4. The spec notes the reference implementation has two textually
    /// identical arms here; this is the single implementation both would have reduced to.
    pub(crate) fn save_stitch_stack(&mut self) {
        let n = self.max_depth;
        self.saved_ids[..n].copy_from_slice(&self.func_ids[..n]);
        self.saved_res[..n].copy_from_slice(&self.func_res[..n]);
        self.saved_lat[..n].copy_from_slice(&self.func_lat[..n]);
        self.saved_depth = self.depth + 1;
        self.saved_max_depth = self.max_depth;
    }

    /// Full reset after a top-level stack is emitted (or desync recovery). Clears the stitch
    /// slot too: a stitch only makes sense within the lifetime of the top-level call that
    /// produced it, and that call has just ended.
    pub(crate) fn reset(&mut self) {
        self.depth = 0;
        self.max_depth = 0;
        self.is_err = false;
        self.kstack_sz = 0;
        self.lbrs_sz = 0;
        self.saved_depth = 0;
        self.saved_max_depth = 0;
    }
}
