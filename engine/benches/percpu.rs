use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use retsnoop_engine::{clock::ManualClock, NullCapture, PerCpuEngine};
use retsnoop_fntable::{FuncFlags, FuncInfo, FuncTable};

fn build_table(depth: usize) -> Arc<FuncTable> {
    let mut funcs = Vec::with_capacity(depth);
    funcs.push(FuncInfo::new("entry", 0x1000, 0x40, FuncFlags::IS_ENTRY | FuncFlags::NEEDS_SIGN_EXT));
    for i in 1..depth {
        funcs.push(FuncInfo::new(format!("f{i}"), 0x1000 + i as u64 * 0x40, 0x40, FuncFlags::NEEDS_SIGN_EXT));
    }
    Arc::new(FuncTable::from_ordered(funcs))
}

/// Throughput of a single entry/exit cycle at a fixed call depth, the hot path real probe
/// handlers run on every traced call.
fn bench_single_call(c: &mut Criterion) {
    let depth = 8;
    let table = build_table(depth);
    let mut engine = PerCpuEngine::new(1, table, ManualClock::new(), NullCapture, false);

    c.bench_function("percpu_entry_exit_depth8_success", |b| {
        b.iter(|| {
            for id in 0..depth as u32 {
                black_box(engine.on_entry(0, id, 1, 1, [0; 16]));
            }
            for id in (0..depth as u32).rev() {
                black_box(engine.on_exit(0, id, 0));
            }
        });
    });
}

/// Same depth, but the leaf fails every call: exercises the stitching branch on every iteration.
fn bench_single_call_failing(c: &mut Criterion) {
    let depth = 8;
    let table = build_table(depth);
    let mut engine = PerCpuEngine::new(1, table, ManualClock::new(), NullCapture, false);

    c.bench_function("percpu_entry_exit_depth8_failing", |b| {
        b.iter(|| {
            for id in 0..depth as u32 {
                black_box(engine.on_entry(0, id, 1, 1, [0; 16]));
            }
            for id in (0..depth as u32).rev() {
                black_box(engine.on_exit(0, id, (-2i64) as u64));
            }
        });
    });
}

criterion_group!(benches, bench_single_call, bench_single_call_failing);
criterion_main!(benches);
