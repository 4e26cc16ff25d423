use retsnoop_engine::CallStack;
use retsnoop_fntable::{errno_of, is_failure, FuncFlags, FuncTable};

use crate::symbolize::NativeSymbols;

// FRAME SHAPES
// ================================================================================================

/// One function-table frame from the logical stack, leaf-first (SPEC_FULL.md §4.5 step 3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalFrame {
    pub name: String,
    pub res: u64,
    pub lat_ns: u64,
    /// `true` for frames pulled from the stitched sibling path rather than the current one.
    pub stitched: bool,
    /// Whether this frame's return value is itself a failure, per the same classification the
    /// engine used (a null-pointer failure has `errno == None` but `failed == true`).
    pub failed: bool,
    pub errno: Option<u16>,
}

/// One resolved native return address from the kernel stack, leaf-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeFrame {
    pub addr: u64,
    pub symbol: Option<String>,
    pub base: Option<u64>,
    /// `true` when this frame was an instrumentation artifact kept only because `--full-stacks`
    /// suppressed the drop (SPEC_FULL.md §4.5 step 5).
    pub filtered_but_visible: bool,
}

impl NativeFrame {
    fn offset(&self) -> u64 {
        match self.base {
            Some(base) => self.addr.saturating_sub(base),
            None => 0,
        }
    }
}

/// One line of the final merged trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergedFrame {
    Matched { logical: LogicalFrame, native: NativeFrame },
    NativeOnly(NativeFrame),
    LogicalOnly(LogicalFrame),
}

// STITCH ADJACENCY
// ================================================================================================

/// Whether the stitched sibling path preserved in `record` still describes a direct sibling of
/// the current leaf's call site (SPEC_FULL.md §4.5 step 2, §8 invariant 7).
///
/// The spec's adjacency condition (`max_depth + 1 == saved_depth`) is stated in terms of the
/// live `max_depth` at the moment a new entry triggers the stitch; by the time a record is
/// emitted, that value has already been overwritten by `on_entry`'s unconditional `max_depth = d
/// + 1` (SPEC_FULL.md §4.3.1). `saved_max_depth` is exactly that pre-overwrite value, captured at
/// stitch time, so the equivalent check on the stored record is `saved_depth == saved_max_depth`.
pub fn stitch_is_adjacent(record: &CallStack) -> bool {
    record.saved_max_depth > 0 && record.saved_depth == record.saved_max_depth
}

// BUILD LOGICAL FRAMES
// ================================================================================================

/// Builds the leaf-first logical frame sequence for a record, appending the stitched sibling
/// path (also leaf-first) when the adjacency condition holds (SPEC_FULL.md §4.5 step 3, §8
/// invariant 7).
pub fn build_fstack(record: &CallStack, table: &FuncTable) -> Vec<LogicalFrame> {
    fn frame_of(table: &FuncTable, id: u32, res: u64, lat_ns: u64, stitched: bool) -> LogicalFrame {
        let flags = table.flags(id);
        LogicalFrame {
            name: table.get(id).map(|f| f.name.clone()).unwrap_or_default(),
            res,
            lat_ns,
            stitched,
            failed: is_failure(flags, res),
            errno: errno_of(res, flags.contains(FuncFlags::NEEDS_SIGN_EXT)),
        }
    }

    let mut frames = Vec::with_capacity(record.max_depth);
    for d in (0..record.max_depth).rev() {
        frames.push(frame_of(table, record.func_ids[d], record.func_res[d], record.func_lat[d], false));
    }

    let include_stitched = stitch_is_adjacent(record);
    if include_stitched {
        let start = record.saved_depth - 1;
        for d in (start..record.saved_max_depth).rev() {
            frames.push(frame_of(table, record.saved_ids[d], record.saved_res[d], record.saved_lat[d], true));
        }
    }
    frames
}

// KSTACK ARTIFACT STRIPPING
// ================================================================================================

/// Return-probe addresses observe entries offset from the real entry point by this many bytes
/// (SPEC_FULL.md glossary "FTRACE_OFFSET").
pub const FTRACE_OFFSET: u64 = 0x5;

fn is_trampoline_symbol(name: &str) -> bool {
    if let Some(rest) = name.strip_prefix("bpf_trampoline_") {
        return !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit());
    }
    if let Some(rest) = name.strip_prefix("bpf_prog_") {
        return !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_hexdigit());
    }
    name == "bpf_get_stack_raw_tp"
}

/// Resolves and filters the raw, leaf-first kernel return address array into printable native
/// frames, implementing SPEC_FULL.md §4.5 steps 4-5.
///
/// `full_stacks` disables the drop and instead marks would-be-dropped frames as
/// `filtered_but_visible` so they remain inspectable.
pub fn build_kstack(raw: &[u64], symbols: &dyn NativeSymbols, full_stacks: bool) -> Vec<NativeFrame> {
    let resolved: Vec<NativeFrame> = raw
        .iter()
        .map(|&addr| {
            let (symbol, base) = match symbols.resolve(addr) {
                Some((name, base)) => (Some(name), Some(base)),
                None => (None, None),
            };
            NativeFrame { addr, symbol, base, filtered_but_visible: false }
        })
        .collect();

    let mut out = Vec::with_capacity(resolved.len());
    let mut i = 0;
    while i < resolved.len() {
        if i + 2 < resolved.len() {
            let (a, tramp, b) = (&resolved[i], &resolved[i + 1], &resolved[i + 2]);
            let sandwich = match (&a.symbol, &tramp.symbol, &b.symbol) {
                (Some(sa), Some(st), Some(sb)) => {
                    sa == sb && is_trampoline_symbol(st) && a.offset() == FTRACE_OFFSET
                },
                _ => false,
            };
            if sandwich {
                if full_stacks {
                    let mut a = a.clone();
                    let mut tramp = tramp.clone();
                    a.filtered_but_visible = true;
                    tramp.filtered_but_visible = true;
                    out.push(a);
                    out.push(tramp);
                }
                out.push(b.clone());
                i += 3;
                continue;
            }
        }

        let is_artifact = resolved[i].symbol.as_deref().is_some_and(is_trampoline_symbol);
        if is_artifact {
            if full_stacks {
                let mut f = resolved[i].clone();
                f.filtered_but_visible = true;
                out.push(f);
            }
            i += 1;
            continue;
        }

        out.push(resolved[i].clone());
        i += 1;
    }
    out
}

// MERGE
// ================================================================================================

/// Walks `fstack` and `kstack` (both leaf-first) together, advancing through `kstack` to find
/// each logical frame's matching native frame and emitting any skipped native-only frames first
/// (SPEC_FULL.md §4.5 step 6, §8 invariant 8).
pub fn merge(fstack: &[LogicalFrame], kstack: &[NativeFrame]) -> Vec<MergedFrame> {
    let mut out = Vec::with_capacity(fstack.len() + kstack.len());
    let mut k = 0;

    for logical in fstack {
        let mut matched = None;
        let mut scan = k;
        while scan < kstack.len() {
            if kstack[scan].symbol.as_deref() == Some(logical.name.as_str()) {
                matched = Some(scan);
                break;
            }
            scan += 1;
        }
        match matched {
            Some(idx) => {
                for native in &kstack[k..idx] {
                    out.push(MergedFrame::NativeOnly(native.clone()));
                }
                out.push(MergedFrame::Matched { logical: logical.clone(), native: kstack[idx].clone() });
                k = idx + 1;
            },
            None => out.push(MergedFrame::LogicalOnly(logical.clone())),
        }
    }
    for native in &kstack[k..] {
        out.push(MergedFrame::NativeOnly(native.clone()));
    }
    out
}
