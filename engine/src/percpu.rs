use retsnoop_fntable::{is_failure, errno_of, FuncFlags, FuncId, FuncTable};
use tracing::trace;

use crate::{
    callstack::{CallStack, MAX_FSTACK_DEPTH},
    capture::StackCapture,
    clock::Clock,
};

// PER-CPU ENGINE
// ================================================================================================

/// Owns one [`CallStack`] per logical CPU and runs the push/pop state machine described in
/// SPEC_FULL.md §4.3.
///
/// Every method here must stay non-blocking and allocation-free on the hot path, mirroring the
/// constraint real probe handlers run under (§5 "Scheduling"). The engine never crosses CPUs: a
/// handler for `cpu` only ever touches `stacks[cpu]`.
pub struct PerCpuEngine<C: Clock, S: StackCapture> {
    stacks: Vec<CallStack>,
    table: std::sync::Arc<FuncTable>,
    clock: C,
    capture: S,
    lbr_enabled: bool,
    /// Diagnostic counters surfaced at shutdown (SPEC_FULL.md §5 "Backpressure").
    pub overflow_count: u64,
    pub desync_count: u64,
}

/// What happened as a result of feeding one event to the engine. The transport only needs to act
/// on [`EngineOutcome::Emit`]; the rest exist so callers/tests can observe and count them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    /// Nothing observable happened (e.g. a non-entry start at depth 0, or overflow).
    Ignored,
    /// The handler advanced the stack but it is still live.
    Progressed,
    /// A top-level stack just completed; caller should send this snapshot to the transport.
    Emit(Box<CallStack>),
    /// The exit's function id did not match the top of stack; the engine reset.
    Desync,
}

impl<C: Clock, S: StackCapture> PerCpuEngine<C, S> {
    pub fn new(num_cpus: usize, table: std::sync::Arc<FuncTable>, clock: C, capture: S, lbr_enabled: bool) -> Self {
        let stacks = (0..num_cpus).map(|cpu| CallStack::new(cpu as u32)).collect();
        Self { stacks, table, clock, capture, lbr_enabled, overflow_count: 0, desync_count: 0 }
    }

    fn flags(&self, id: FuncId) -> FuncFlags {
        self.table.flags(id)
    }

    /// SPEC_FULL.md §4.3.1.
    pub fn on_entry(&mut self, cpu: u32, id: FuncId, pid: u32, tgid: u32, comm: [u8; 16]) -> EngineOutcome {
        let s = &mut self.stacks[cpu as usize];
        let d = s.depth;

        if d == 0 && !self.table.flags(id).contains(FuncFlags::IS_ENTRY) {
            return EngineOutcome::Ignored;
        }
        if d == MAX_FSTACK_DEPTH {
            self.overflow_count += 1;
            return EngineOutcome::Ignored;
        }

        if s.depth != s.max_depth && s.is_err {
            s.save_stitch_stack();
        }

        if d == 0 {
            s.pid = pid;
            s.tgid = tgid;
            s.comm = comm;
        }

        s.func_ids[d] = id;
        s.func_lat[d] = self.clock.now_ns();
        s.is_err = false;
        s.depth = d + 1;
        s.max_depth = d + 1;

        trace!(cpu, id, depth = s.depth, "on_entry");
        EngineOutcome::Progressed
    }

    /// SPEC_FULL.md §4.3.2.
    pub fn on_exit(&mut self, cpu: u32, id: FuncId, ret: u64) -> EngineOutcome {
        let flags = self.flags(id);
        let lbr_enabled = self.lbr_enabled;
        let s = &mut self.stacks[cpu as usize];

        if s.depth == 0 {
            return EngineOutcome::Ignored;
        }
        let d = s.depth - 1;
        if s.func_ids[d] != id {
            self.desync_count += 1;
            let s = &mut self.stacks[cpu as usize];
            s.reset();
            return EngineOutcome::Desync;
        }

        let failed = is_failure(flags, ret);

        s.func_res[d] = ret;
        s.func_lat[d] = self.clock.now_ns().saturating_sub(s.func_lat[d]);

        if failed && !s.is_err {
            s.is_err = true;
            s.max_depth = d + 1;
            s.kstack_sz = self.capture.capture_kernel_stack(cpu, &mut s.kstack);
            if lbr_enabled {
                s.lbrs_sz = self.capture.capture_branch_stack(cpu, &mut s.lbrs);
            }
        }
        s.depth = d;

        trace!(cpu, id, depth = s.depth, failed, "on_exit");

        if s.depth == 0 {
            s.emit_ts = self.clock.now_ns();
            let record = Box::new(s.clone());
            s.reset();
            EngineOutcome::Emit(record)
        } else {
            EngineOutcome::Progressed
        }
    }

    /// Read-only access to one CPU's live state, for tests and diagnostics.
    pub fn stack(&self, cpu: u32) -> &CallStack {
        &self.stacks[cpu as usize]
    }

    /// Magnitude of the errno a frame's return value represents, honoring `NEEDS_SIGN_EXT`. A
    /// thin wrapper kept here so callers don't need to import `retsnoop_fntable` just to reuse
    /// this one derivation.
    pub fn frame_errno(flags: FuncFlags, ret: u64) -> Option<u16> {
        errno_of(ret, flags.contains(FuncFlags::NEEDS_SIGN_EXT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capture::NullCapture, clock::ManualClock};
    use retsnoop_fntable::{FuncInfo, FuncTable};
    use std::sync::Arc;

    fn table_with(flags: &[FuncFlags]) -> Arc<FuncTable> {
        let funcs = flags
            .iter()
            .enumerate()
            .map(|(i, f)| FuncInfo::new(format!("f{i}"), 0x1000 + i as u64 * 0x40, 0x40, *f))
            .collect();
        Arc::new(FuncTable::from_ordered(funcs))
    }

    fn comm(name: &str) -> [u8; 16] {
        let mut c = [0u8; 16];
        let bytes = name.as_bytes();
        let n = bytes.len().min(15);
        c[..n].copy_from_slice(&bytes[..n]);
        c
    }

    #[test]
    fn s1_single_failing_entry() {
        // A (IS_ENTRY), B: enter A, enter B, exit B ret=-2, exit A ret=-2.
        let table = table_with(&[FuncFlags::IS_ENTRY, FuncFlags::NEEDS_SIGN_EXT]);
        let mut engine = PerCpuEngine::new(1, table, ManualClock::new(), NullCapture, false);

        assert_eq!(engine.on_entry(0, 0, 100, 100, comm("a")), EngineOutcome::Progressed);
        assert_eq!(engine.on_entry(0, 1, 100, 100, comm("a")), EngineOutcome::Progressed);
        assert_eq!(engine.on_exit(0, 1, (-2i64) as u64), EngineOutcome::Progressed);
        match engine.on_exit(0, 0, (-2i64) as u64) {
            EngineOutcome::Emit(rec) => {
                assert_eq!(rec.depth, 0);
                assert_eq!(rec.max_depth, 2);
                assert!(rec.is_err);
                assert_eq!(rec.func_res[0], (-2i64) as u64);
                assert_eq!(rec.func_res[1], (-2i64) as u64);
            },
            other => panic!("expected Emit, got {other:?}"),
        }
    }

    #[test]
    fn s2_recovery_plus_sibling_stitch() {
        // enter A, enter B, exit B ret=-12, enter C, exit C ret=0, exit A ret=0.
        let table = table_with(&[FuncFlags::IS_ENTRY, FuncFlags::NEEDS_SIGN_EXT, FuncFlags::NEEDS_SIGN_EXT]);
        let mut engine = PerCpuEngine::new(1, table, ManualClock::new(), NullCapture, false);

        engine.on_entry(0, 0, 1, 1, comm("a"));
        engine.on_entry(0, 1, 1, 1, comm("a"));
        engine.on_exit(0, 1, (-12i64) as u64);
        // A is_err is now true, depth=1 != max_depth=2: next entry stitches.
        engine.on_entry(0, 2, 1, 1, comm("a"));
        engine.on_exit(0, 2, 0);
        let outcome = engine.on_exit(0, 0, 0);
        match outcome {
            EngineOutcome::Emit(rec) => {
                assert!(!rec.is_err, "current path A->C succeeded");
                assert_eq!(rec.saved_depth, 2); // depth(1)+1 at time of stitch
                assert_eq!(rec.saved_max_depth, 2);
                assert_eq!(rec.saved_ids[0], 0);
                assert_eq!(rec.saved_ids[1], 1);
                assert_eq!(rec.saved_res[1], (-12i64) as u64);
            },
            other => panic!("expected Emit, got {other:?}"),
        }
    }

    #[test]
    fn s3_stack_desync_then_recovery() {
        let table = table_with(&[FuncFlags::IS_ENTRY, FuncFlags::NEEDS_SIGN_EXT]);
        let mut engine = PerCpuEngine::new(1, table, ManualClock::new(), NullCapture, false);

        engine.on_entry(0, 0, 1, 1, comm("a"));
        engine.on_entry(0, 1, 1, 1, comm("a"));
        // missing exit for B; exit A observed instead.
        let outcome = engine.on_exit(0, 0, 0);
        assert_eq!(outcome, EngineOutcome::Desync);
        assert_eq!(engine.stack(0).depth, 0);
        assert_eq!(engine.stack(0).max_depth, 0);

        // subsequent entry/exit proceeds normally.
        engine.on_entry(0, 0, 2, 2, comm("a"));
        match engine.on_exit(0, 0, 0) {
            EngineOutcome::Emit(rec) => assert!(!rec.is_err),
            other => panic!("expected Emit, got {other:?}"),
        }
    }

    #[test]
    fn s4_pointer_return_null_is_failure() {
        let table = table_with(&[FuncFlags::IS_ENTRY | FuncFlags::RET_PTR]);
        let mut engine = PerCpuEngine::new(1, table, ManualClock::new(), NullCapture, false);

        engine.on_entry(0, 0, 1, 1, comm("a"));
        match engine.on_exit(0, 0, 0) {
            EngineOutcome::Emit(rec) => assert!(rec.is_err),
            other => panic!("expected Emit, got {other:?}"),
        }
    }

    #[test]
    fn non_entry_start_at_depth_zero_is_ignored() {
        let table = table_with(&[FuncFlags::empty()]);
        let mut engine = PerCpuEngine::new(1, table, ManualClock::new(), NullCapture, false);
        assert_eq!(engine.on_entry(0, 0, 1, 1, comm("a")), EngineOutcome::Ignored);
        assert_eq!(engine.stack(0).depth, 0);
    }

    #[test]
    fn overflow_past_max_depth_is_ignored_and_counted() {
        let flags = vec![FuncFlags::IS_ENTRY; MAX_FSTACK_DEPTH + 1];
        let table = table_with(&flags);
        let mut engine = PerCpuEngine::new(1, table, ManualClock::new(), NullCapture, false);
        for i in 0..MAX_FSTACK_DEPTH {
            engine.on_entry(0, i as FuncId, 1, 1, comm("a"));
        }
        assert_eq!(engine.overflow_count, 0);
        let outcome = engine.on_entry(0, MAX_FSTACK_DEPTH as FuncId, 1, 1, comm("a"));
        assert_eq!(outcome, EngineOutcome::Ignored);
        assert_eq!(engine.overflow_count, 1);
    }
}
