//! Snapshot tests pinning the reconciliation pipeline's output for the concrete scenarios named
//! in SPEC_FULL.md §8 (S1, S2, S5, S7), so a regression in filtering/merging/trimming shows up as
//! a reviewable diff rather than a silently changed behavior.

use retsnoop_engine::{BranchSample, CallStack};
use retsnoop_fntable::{FuncFlags, FuncInfo, FuncTable};
use retsnoop_render::{build_fstack, build_kstack, merge, trim_lbr, FuncRange, MergedFrame, NativeSymbols};

fn summarize(merged: &[MergedFrame]) -> String {
    merged
        .iter()
        .map(|frame| match frame {
            MergedFrame::Matched { logical, native } => {
                format!(
                    "matched  {} failed={} errno={:?} stitched={} native={}+0x{:x}",
                    logical.name,
                    logical.failed,
                    logical.errno,
                    logical.stitched,
                    native.symbol.as_deref().unwrap_or("?"),
                    native.addr.saturating_sub(native.base.unwrap_or(native.addr)),
                )
            },
            MergedFrame::LogicalOnly(logical) => {
                format!(
                    "logical  {} failed={} errno={:?} stitched={}",
                    logical.name, logical.failed, logical.errno, logical.stitched
                )
            },
            MergedFrame::NativeOnly(native) => {
                format!("native   {}", native.symbol.as_deref().unwrap_or("?"))
            },
        })
        .collect::<Vec<_>>()
        .join("\n")
}

struct MapSymbols(Vec<(u64, u64, &'static str)>);

impl NativeSymbols for MapSymbols {
    fn resolve(&self, addr: u64) -> Option<(String, u64)> {
        self.0
            .iter()
            .find(|(base, size, _)| addr >= *base && addr < base + size)
            .map(|(base, _, name)| (name.to_string(), *base))
    }
}

#[test]
fn s1_single_failing_entry() {
    let table = FuncTable::from_ordered(vec![
        FuncInfo::new("A", 0x1000, 0x40, FuncFlags::IS_ENTRY | FuncFlags::NEEDS_SIGN_EXT),
        FuncInfo::new("B", 0x2000, 0x40, FuncFlags::NEEDS_SIGN_EXT),
    ]);
    let mut record = CallStack::new(0);
    record.max_depth = 2;
    record.func_ids[0] = 0;
    record.func_ids[1] = 1;
    record.func_res[0] = (-2i64) as u64;
    record.func_res[1] = (-2i64) as u64;

    let fstack = build_fstack(&record, &table);
    let merged = merge(&fstack, &[]);
    insta::assert_snapshot!(summarize(&merged), @r###"
    logical  B failed=true errno=Some(2) stitched=false
    logical  A failed=true errno=Some(2) stitched=false
    "###);
}

#[test]
fn s2_recovery_plus_stitched_sibling() {
    let table = FuncTable::from_ordered(vec![
        FuncInfo::new("A", 0x1000, 0x40, FuncFlags::IS_ENTRY | FuncFlags::NEEDS_SIGN_EXT),
        FuncInfo::new("B", 0x2000, 0x40, FuncFlags::NEEDS_SIGN_EXT),
        FuncInfo::new("C", 0x3000, 0x40, FuncFlags::NEEDS_SIGN_EXT),
    ]);
    let mut record = CallStack::new(0);
    record.max_depth = 2;
    record.func_ids[0] = 0;
    record.func_ids[1] = 2;
    record.func_res[0] = 0;
    record.func_res[1] = 0;
    record.saved_ids[0] = 0;
    record.saved_ids[1] = 1;
    record.saved_res[1] = (-12i64) as u64;
    record.saved_depth = 2; // equals saved_max_depth: stitched sibling is adjacent
    record.saved_max_depth = 2;

    let fstack = build_fstack(&record, &table);
    let merged = merge(&fstack, &[]);
    insta::assert_snapshot!(summarize(&merged), @r###"
    logical  C failed=false errno=None stitched=false
    logical  A failed=false errno=None stitched=false
    logical  B failed=true errno=Some(12) stitched=true
    "###);
}

#[test]
fn s5_trampoline_sandwich_filter() {
    let raw = vec![0x103f, 0x206d, 0x1005, 0x3010];
    let symbols = MapSymbols(vec![
        (0x1000, 0x100, "bpf_map_alloc_percpu"),
        (0x2000, 0x100, "bpf_trampoline_42"),
        (0x3000, 0x100, "caller"),
    ]);
    let kstack = build_kstack(&raw, &symbols, false);
    let merged = merge(&[], &kstack);
    insta::assert_snapshot!(summarize(&merged), @r###"
    native   bpf_map_alloc_percpu
    native   caller
    "###);
}

#[test]
fn s7_lbr_trim() {
    let samples = vec![
        BranchSample { from: 0x2000, to: 0x2010 },
        BranchSample { from: 0x1080, to: 0x1090 },
        BranchSample { from: 0x1040, to: 0x1050 },
    ];
    let trimmed = trim_lbr(&samples, FuncRange { entry: 0x1000, size: 0x100 });
    let summary = format!(
        "trimmed={} samples={}",
        trimmed.trimmed,
        trimmed
            .samples
            .iter()
            .map(|s| format!("0x{:x}->0x{:x}", s.from, s.to))
            .collect::<Vec<_>>()
            .join(", ")
    );
    insta::assert_snapshot!(summary, @"trimmed=true samples=0x1080->0x1090, 0x1040->0x1050");
}
