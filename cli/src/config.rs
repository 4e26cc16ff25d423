use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use retsnoop_fntable::{errno_of_name, ErrorMask};
use retsnoop_plan::PlanRequest;
use retsnoop_render::FilterConfig;

use crate::errors::CliError;

// PRESET BUNDLES
// ================================================================================================

/// Compiled-in glob bundles selectable with `-c NAME`, merged into the allow set before planning
/// (SPEC_FULL.md §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// BPF syscall and verifier entry points.
    Bpf,
    /// perf_event subsystem entry points.
    Perf,
}

impl Preset {
    fn globs(self) -> &'static [&'static str] {
        match self {
            Preset::Bpf => &["__sys_bpf", "bpf_map_*", "bpf_prog_*", "bpf_btf_*", "bpf_trampoline_*"],
            Preset::Perf => &["perf_event_*", "perf_install_in_context", "perf_event_open*"],
        }
    }
}

// ATTACH MODE
// ================================================================================================

/// `-M`/`-K`/`-F`: mutually exclusive attach strategies (SPEC_FULL.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachMode {
    /// One probe program attached to every instrumented function (`-M`).
    #[default]
    Multi,
    /// One probe program instance per instrumented function (`-K`).
    Single,
    /// fentry/fexit attachment (`-F`).
    Fentry,
}

// SYMBOLIZATION LEVEL
// ================================================================================================

/// `-s`/`-ss`/`-sn`: how much line/inline information the renderer attaches to each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymLevel {
    #[default]
    Lines,
    Inlines,
    None,
}

/// Parses the value attached to `-s`: absent (plain `-s`) is handled by `default_missing_value`
/// below and never reaches this function; `s` (from `-ss`) means "with inlines", `n` (from `-sn`)
/// means "no symbolization".
fn parse_sym_level(raw: &str) -> Result<SymLevel, String> {
    match raw {
        "lines" => Ok(SymLevel::Lines),
        "s" | "inlines" => Ok(SymLevel::Inlines),
        "n" | "none" => Ok(SymLevel::None),
        other => Err(format!("unrecognized symbolization level `-s{other}` (expected `-s`, `-ss`, or `-sn`)")),
    }
}

// CLI ARGUMENTS
// ================================================================================================

/// Trace failing kernel function calls and print their logical call stacks.
#[derive(Debug, Parser)]
#[command(name = "retsnoop", version, about)]
pub struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace + backend spans).
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Apply a compiled-in preset glob bundle, merged into the allow set.
    #[arg(short = 'c', long = "preset", value_enum)]
    pub presets: Vec<Preset>,

    /// Add an entry glob (a traced stack must start at one of these).
    #[arg(short = 'e', long = "entry")]
    pub entry: Vec<String>,

    /// Add an allow glob.
    #[arg(short = 'a', long = "allow")]
    pub allow: Vec<String>,

    /// Add a deny glob.
    #[arg(short = 'd', long = "deny")]
    pub deny: Vec<String>,

    /// Allow a process id.
    #[arg(short = 'p', long = "pid")]
    pub allow_pid: Vec<u32>,

    /// Deny a process id.
    #[arg(short = 'P', long = "deny-pid")]
    pub deny_pid: Vec<u32>,

    /// Allow a process name (<=15 chars).
    #[arg(short = 'n', long = "comm")]
    pub allow_comm: Vec<String>,

    /// Deny a process name (<=15 chars).
    #[arg(short = 'N', long = "deny-comm")]
    pub deny_comm: Vec<String>,

    /// Emit only stacks with total latency at or above this many milliseconds.
    #[arg(short = 'L', long = "longer-than", default_value_t = 0)]
    pub longer_than_ms: u64,

    /// Emit successful stacks too, not just failing ones.
    #[arg(short = 'S', long = "success")]
    pub report_successes: bool,

    /// Emit intermediate (non-final) stacks in addition to completed ones.
    #[arg(short = 'A', long = "intermediate")]
    pub report_intermediate: bool,

    /// Allow an error name (e.g. `ENOENT` or `-ENOENT`).
    #[arg(short = 'x', long = "allow-errno")]
    pub allow_errno: Vec<String>,

    /// Deny an error name.
    #[arg(short = 'X', long = "deny-errno")]
    pub deny_errno: Vec<String>,

    /// Symbolization level: plain `-s` for line info, `-ss` for +inlines, `-sn` for none.
    #[arg(
        short = 's',
        long = "sym",
        num_args = 0..=1,
        default_missing_value = "lines",
        value_parser = parse_sym_level,
    )]
    pub sym_level: Option<SymLevel>,

    /// Path to a debug image (e.g. vmlinux) used for DWARF line/inline symbolization.
    #[arg(short = 'k', long = "debug-image")]
    pub debug_image: Option<PathBuf>,

    /// Attach one probe program to every instrumented function.
    #[arg(short = 'M', long = "multi-attach", conflicts_with_all = ["single_attach", "fentry_attach"])]
    pub multi_attach: bool,

    /// Attach one probe program instance per instrumented function.
    #[arg(short = 'K', long = "single-attach", conflicts_with_all = ["multi_attach", "fentry_attach"])]
    pub single_attach: bool,

    /// Attach via fentry/fexit.
    #[arg(short = 'F', long = "fentry-attach", conflicts_with_all = ["multi_attach", "single_attach"])]
    pub fentry_attach: bool,

    /// Enable branch-stack (LBR) capture, with optional backend-specific flags.
    #[arg(long = "lbr", num_args = 0..=1, default_missing_value = "")]
    pub lbr: Option<String>,

    /// Disable artifact filtering: render every native frame exactly as captured.
    #[arg(long = "full-stacks")]
    pub full_stacks: bool,

    /// Backend stack map capacity (number of in-flight completed stacks the transport can hold).
    #[arg(long = "stacks-map-size", default_value_t = 4096)]
    pub stacks_map_size: usize,

    /// Plan and validate the configuration; do not attach any probes.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

// CONFIG
// ================================================================================================

/// The single immutable struct assembled from parsed arguments, handed by reference to the
/// planner, engine, backend and renderer (SPEC_FULL.md §6.2).
#[derive(Debug, Clone)]
pub struct Config {
    pub plan_request: PlanRequest,
    pub filter: FilterConfig,
    pub sym_level: SymLevel,
    pub debug_image: Option<PathBuf>,
    pub attach_mode: AttachMode,
    pub lbr: Option<String>,
    pub full_stacks: bool,
    pub stacks_map_size: usize,
    pub dry_run: bool,
}

impl Config {
    /// Assembles a [`Config`] from parsed CLI arguments, expanding preset bundles into the allow
    /// set and resolving `-x`/`-X` error names into [`ErrorMask`]s. Pure with respect to the
    /// filesystem and kernel: callers supply a [`retsnoop_plan::SymbolUniverse`] separately.
    pub fn from_args(args: &Args) -> Result<Self, CliError> {
        let mut allow = args.allow.clone();
        for preset in &args.presets {
            allow.extend(preset.globs().iter().map(|s| s.to_string()));
        }

        let mut plan_request = PlanRequest::new();
        plan_request.entry_globs = args.entry.clone();
        plan_request.allow_globs = allow;
        plan_request.deny_globs = args.deny.clone();

        let mut allow_mask = ErrorMask::all();
        for name in &args.allow_errno {
            let errno = errno_of_name(name).ok_or_else(|| CliError::UnknownErrno(name.clone()))?;
            allow_mask.set(errno);
        }
        let mut deny_mask = ErrorMask::none();
        for name in &args.deny_errno {
            let errno = errno_of_name(name).ok_or_else(|| CliError::UnknownErrno(name.clone()))?;
            deny_mask.set(errno);
        }

        let attach_mode = if args.single_attach {
            AttachMode::Single
        } else if args.fentry_attach {
            AttachMode::Fentry
        } else {
            AttachMode::Multi
        };

        let sym_level = args.sym_level.unwrap_or_default();

        Ok(Self {
            plan_request,
            filter: FilterConfig {
                report_successes: args.report_successes,
                longer_than_ms: args.longer_than_ms,
                allow_mask,
                deny_mask,
                allow_pid: args.allow_pid.clone(),
                deny_pid: args.deny_pid.clone(),
                allow_comm: args.allow_comm.clone(),
                deny_comm: args.deny_comm.clone(),
            },
            sym_level,
            debug_image: args.debug_image.clone(),
            attach_mode,
            lbr: args.lbr.clone(),
            full_stacks: args.full_stacks,
            stacks_map_size: args.stacks_map_size,
            dry_run: args.dry_run,
        })
    }
}
