use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use retsnoop_backend::ClockOffset;
use retsnoop_engine::Transport;
use retsnoop_fntable::FuncTable;
use retsnoop_render::{render_record, FilterConfig, NativeSymbols, Symbolizer};

// TERMINATION FLAG
// ================================================================================================

static TERMINATED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_sig: libc::c_int) {
    TERMINATED.store(true, Ordering::SeqCst);
}

/// Installs a `SIGINT`/`SIGTERM` handler that flips a process-wide flag, matching SPEC_FULL.md
/// §5's "a single termination flag set by an interrupt signal". Safe to call more than once.
pub fn install_signal_handler() {
    unsafe {
        libc::signal(libc::SIGINT, on_signal as usize);
        libc::signal(libc::SIGTERM, on_signal as usize);
    }
}

/// Whether a termination signal has been observed since the process started (or since the last
/// call to [`reset_for_test`]).
pub fn should_stop() -> bool {
    TERMINATED.load(Ordering::SeqCst)
}

#[cfg(test)]
pub fn reset_for_test() {
    TERMINATED.store(false, Ordering::SeqCst);
}

/// How long to block on the transport between polls when nothing is queued (SPEC_FULL.md §5:
/// "the only blocking call is the transport poll, bounded timeout, default 100 ms").
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

// POLL STEP
// ================================================================================================

/// Drains and renders at most one completed stack from `transport`, or `None` if nothing was
/// queued or the record was filtered out. Kept as a single non-blocking step so the caller
/// controls its own sleep/termination-check cadence (SPEC_FULL.md §4.5, §5).
pub fn render_next(
    transport: &Transport,
    table: &FuncTable,
    filter: &FilterConfig,
    clock_offset: ClockOffset,
    native_symbols: &dyn NativeSymbols,
    symbolizer: &dyn Symbolizer,
    full_stacks: bool,
) -> Option<String> {
    let record = transport.try_recv()?;
    if !retsnoop_render::passes_filter(&record, table, filter) {
        return None;
    }
    let wall_ns = clock_offset.to_wall_ns(record.emit_ts);
    Some(render_record(&record, table, wall_ns, native_symbols, symbolizer, full_stacks))
}

/// Drives the consumer side of the event pipeline until a termination signal is observed: poll,
/// render and print whatever is queued, sleep [`POLL_INTERVAL`] when nothing was, repeat
/// (SPEC_FULL.md §5). The probe-side engine that actually feeds `transport` runs on whatever
/// backend attached the probes; this loop only ever consumes.
pub fn run_loop(
    transport: &Transport,
    table: &FuncTable,
    filter: &FilterConfig,
    clock_offset: ClockOffset,
    native_symbols: &dyn NativeSymbols,
    symbolizer: &dyn Symbolizer,
    full_stacks: bool,
) {
    while !should_stop() {
        match render_next(transport, table, filter, clock_offset, native_symbols, symbolizer, full_stacks) {
            Some(text) => println!("{text}"),
            None => std::thread::sleep(POLL_INTERVAL),
        }
    }
}
