use tracing_subscriber::EnvFilter;

// LOGGING SETUP
// ================================================================================================

/// Installs the global `tracing` subscriber, matching SPEC_FULL.md §6.1: `-v`/`-vv`/`-vvv` pick a
/// default filter, `RETSNOOP_LOG` overrides it when set, and everything goes to stderr so stdout
/// stays reserved for trace output.
pub fn init(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("RETSNOOP_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
