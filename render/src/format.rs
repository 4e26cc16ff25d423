use retsnoop_fntable::render_errno;

use crate::reconcile::MergedFrame;
use crate::symbolize::{InlineFrame, ResolvedFrame};

// WALL-CLOCK HEADER
// ================================================================================================

const NS_PER_MS: u64 = 1_000_000;
const MS_PER_SEC: u64 = 1_000;
const SECS_PER_MIN: u64 = 60;
const MINS_PER_HOUR: u64 = 60;
const SECS_PER_DAY: u64 = 86_400;

/// Renders the time-of-day portion of a wall-clock nanosecond timestamp as `HH:MM:SS.mmm` (UTC).
///
/// No timezone database is consulted — matching the "no aggregation, no persistence" scope of
/// this tool, the header only needs to be a human-legible wall-clock stamp alongside live output.
fn format_time_of_day(wall_ns: u64) -> String {
    let total_ms = wall_ns / NS_PER_MS;
    let ms_of_day = (total_ms % (SECS_PER_DAY * MS_PER_SEC)) as u64;
    let secs = ms_of_day / MS_PER_SEC;
    let ms = ms_of_day % MS_PER_SEC;
    let hh = secs / (SECS_PER_MIN * MINS_PER_HOUR);
    let mm = (secs / SECS_PER_MIN) % MINS_PER_HOUR;
    let ss = secs % SECS_PER_MIN;
    format!("{hh:02}:{mm:02}:{ss:02}.{ms:03}")
}

pub(crate) fn comm_str(comm: &[u8]) -> String {
    let end = comm.iter().position(|&b| b == 0).unwrap_or(comm.len());
    String::from_utf8_lossy(&comm[..end]).into_owned()
}

/// `header HH:MM:SS.mmm PID N (comm):` (SPEC_FULL.md §4.5 step 8).
pub fn format_header(wall_ns: u64, pid: u32, comm: &[u8]) -> String {
    format!("{} PID {} ({}):", format_time_of_day(wall_ns), pid, comm_str(comm))
}

// FRAME LINES
// ================================================================================================

/// Everything [`format_frame`] needs about one merged trace line, combining the logical/native
/// reconciliation result with the (optional) DWARF enrichment of its address.
#[derive(Debug, Clone)]
pub struct FrameView {
    pub stitched: bool,
    /// `None` for native-only frames, which carry no logical latency/result.
    pub lat_ns: Option<u64>,
    /// `None` for frames whose return value was not itself a failure.
    pub err_label: Option<String>,
    pub name: String,
    pub offset: u64,
    pub resolved: ResolvedFrame,
}

impl FrameView {
    pub fn from_merged(merged: &MergedFrame, resolved: ResolvedFrame) -> Self {
        match merged {
            MergedFrame::Matched { logical, native } => Self {
                stitched: logical.stitched,
                lat_ns: Some(logical.lat_ns),
                err_label: err_label_for(logical),
                name: native.symbol.clone().unwrap_or_else(|| logical.name.clone()),
                offset: native.addr.saturating_sub(native.base.unwrap_or(native.addr)),
                resolved,
            },
            MergedFrame::LogicalOnly(logical) => Self {
                stitched: logical.stitched,
                lat_ns: Some(logical.lat_ns),
                err_label: err_label_for(logical),
                name: logical.name.clone(),
                offset: 0,
                resolved,
            },
            MergedFrame::NativeOnly(native) => Self {
                stitched: false,
                lat_ns: None,
                err_label: None,
                name: native.symbol.clone().unwrap_or_else(|| format!("0x{:x}", native.addr)),
                offset: native.addr.saturating_sub(native.base.unwrap_or(native.addr)),
                resolved,
            },
        }
    }
}

/// Labels a failing frame the way the renderer prints it: `[NULL]` for a null-pointer failure
/// with no errno, `[-ENOENT]`/`[-12345]` otherwise. `None` for non-failing frames, which print no
/// bracketed error at all.
fn err_label_for(logical: &crate::reconcile::LogicalFrame) -> Option<String> {
    if !logical.failed {
        return None;
    }
    match logical.errno {
        Some(errno) => Some(format!("[{}]", render_errno(errno))),
        None => Some("[NULL]".to_string()),
    }
}

/// `[sign] [stitched-marker] LAT ERR NAME+OFF  (source:line)` (SPEC_FULL.md §4.5 step 8), plus one
/// indented continuation line per inlined frame.
pub fn format_frame(frame: &FrameView) -> String {
    let sign = if frame.err_label.is_some() { "!" } else { " " };
    let marker = if frame.stitched { "*" } else { " " };
    let lat = match frame.lat_ns {
        Some(ns) => format!("{:>8.3}ms", ns as f64 / NS_PER_MS as f64),
        None => " ".repeat(10),
    };
    let err = frame.err_label.clone().unwrap_or_default();
    let location = match (&frame.resolved.file, frame.resolved.line) {
        (Some(file), Some(line)) => format!("  ({file}:{line})"),
        (Some(file), None) => format!("  ({file})"),
        _ => String::new(),
    };

    let mut line = format!(
        "{sign} {marker} {lat} {err:<10} {}+0x{:x}{}",
        frame.name, frame.offset, location
    );
    for inline in &frame.resolved.inlines {
        line.push('\n');
        line.push_str(&format_inline(inline));
    }
    line
}

fn format_inline(inline: &InlineFrame) -> String {
    let name = inline.function.as_deref().unwrap_or("??");
    match (&inline.file, inline.line) {
        (Some(file), Some(line)) => format!("        (inlined) {name} ({file}:{line})"),
        _ => format!("        (inlined) {name}"),
    }
}
