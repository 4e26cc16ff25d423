//! Stack filtering, fstack/kstack reconciliation, symbolization, and text rendering.
//!
//! This crate never touches the probe side or the kernel directly; it consumes completed
//! [`retsnoop_engine::CallStack`] records and two narrow collaborator traits
//! ([`symbolize::NativeSymbols`], [`symbolize::Symbolizer`]) that `retsnoop-backend` implements.

pub mod errors;
pub mod filter;
pub mod format;
pub mod lbr;
pub mod reconcile;
pub mod symbolize;

pub use errors::RenderError;
pub use filter::{passes_filter, FilterConfig};
pub use format::{format_frame, format_header, FrameView};
pub use lbr::{trim as trim_lbr, FuncRange, LbrRender};
pub use reconcile::{build_fstack, build_kstack, merge, LogicalFrame, MergedFrame, NativeFrame};
pub use symbolize::{InlineFrame, NativeSymbols, NullNativeSymbols, NullSymbolizer, ResolvedFrame, Symbolizer};

use retsnoop_engine::CallStack;
use retsnoop_fntable::FuncTable;

/// Renders one filtered, already-dequeued record to the final multi-line text block printed to
/// stdout (SPEC_FULL.md §4.5 steps 3-8), given the wall-clock timestamp for its header.
pub fn render_record(
    record: &CallStack,
    table: &FuncTable,
    wall_ns: u64,
    native_symbols: &dyn NativeSymbols,
    symbolizer: &dyn Symbolizer,
    full_stacks: bool,
) -> String {
    let fstack = build_fstack(record, table);
    let kstack = build_kstack(&record.kstack[..record.kstack_sz], native_symbols, full_stacks);
    let merged = merge(&fstack, &kstack);

    let mut out = format_header(wall_ns, record.pid, &record.comm);
    for frame in &merged {
        let native = match frame {
            MergedFrame::Matched { native, .. } => Some(native),
            MergedFrame::NativeOnly(native) => Some(native),
            MergedFrame::LogicalOnly(_) => None,
        };
        let resolved = native.map(|n| symbolizer.resolve(symbolize_addr(n))).unwrap_or_default();
        out.push('\n');
        out.push_str(&format_frame(&FrameView::from_merged(frame, resolved)));
    }
    out
}

/// The address to hand to the symbolizer for `native`: a return-probed address landing exactly at
/// the function's entry `+FTRACE_OFFSET` is resolved at the entry itself instead, matching
/// SPEC_FULL.md §4.5 step 7 ("when an address equals a function entry +FTRACE_OFFSET, resolve at
/// `address − FTRACE_OFFSET` instead").
fn symbolize_addr(native: &NativeFrame) -> u64 {
    match native.base {
        Some(base) if native.addr == base + reconcile::FTRACE_OFFSET => native.addr - reconcile::FTRACE_OFFSET,
        _ => native.addr,
    }
}
