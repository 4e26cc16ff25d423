//! `retsnoop`: trace failing kernel function calls and print their logical call stacks.
//!
//! This binary only wires together the library crates: [`retsnoop_plan`] turns CLI globs into a
//! [`retsnoop_fntable::FuncTable`], [`retsnoop_backend`] supplies symbol/DWARF/LBR collaborators,
//! [`retsnoop_engine`] runs the per-CPU state machine, and [`retsnoop_render`] formats completed
//! stacks. No other crate decides exit codes or touches stdout/stderr directly (SPEC_FULL.md
//! §7.1).

mod config;
mod errors;
mod logging;
mod runtime;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use retsnoop_backend::{calibrate, sample_real_triple, AttachError, DwarfSymbolizer, Features, KallsymsTable, KernelUniverse};
use retsnoop_engine::Transport;
use retsnoop_fntable::FuncTable;
use retsnoop_plan::plan;
use retsnoop_render::{NativeSymbols, NullSymbolizer, Symbolizer};

use config::{AttachMode, Args, Config, SymLevel};
use errors::CliError;

const KALLSYMS_PATH: &str = "/proc/kallsyms";
const FEATURE_SYSFS_ROOT: &str = "/sys";

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("retsnoop: {err}");
            ExitCode::from(err.exit_code() as u8)
        },
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let config = Config::from_args(args)?;

    let kallsyms = KallsymsTable::load(KALLSYMS_PATH)?;
    let universe = KernelUniverse::new(&kallsyms);
    let table = plan(&config.plan_request, &universe)?;

    tracing::info!(functions = table.len(), "planned function table");

    if config.dry_run {
        print_plan_summary(&table);
        return Ok(());
    }

    attach_and_run(&config, table, kallsyms)
}

fn print_plan_summary(table: &FuncTable) {
    println!("retsnoop: dry run, {} function(s) planned for attachment:", table.len());
    for (id, info) in table.iter() {
        println!("  [{id}] {} @ {:#x} (+{:#x})", info.name, info.entry_address, info.body_size);
    }
}

/// Validates the requested attach mode against detected backend capabilities, then drives the
/// consumer side of the pipeline once probes are installed.
///
/// The engine that actually runs `on_entry`/`on_exit` lives on the probe side (SPEC_FULL.md §9:
/// "Probe-side vs user-side split") — a kernel-resident sandboxed executor this crate does not
/// ship. [`install_probes`] is the single named point where that backend would be wired in; it
/// always reports [`AttachError::UnsupportedAttachMode`] today.
fn attach_and_run(config: &Config, table: FuncTable, kallsyms: KallsymsTable) -> Result<(), CliError> {
    let features = Features::detect(FEATURE_SYSFS_ROOT);
    match config.attach_mode {
        AttachMode::Multi if !features.multi_attach => {
            return Err(AttachError::UnsupportedAttachMode("multi-attach (-M) is unsupported on this kernel").into())
        },
        AttachMode::Fentry if !features.function_ip_helper => {
            return Err(AttachError::UnsupportedAttachMode("fentry attach (-F) is unsupported on this kernel").into())
        },
        _ => {},
    }
    if config.lbr.is_some() && !features.branch_snapshot {
        tracing::warn!("--lbr requested but branch-stack sampling is unsupported on this kernel; continuing without it");
    }

    runtime::install_signal_handler();

    let table = Arc::new(table);
    install_probes(config, &table)?;

    let transport = Transport::new(config.stacks_map_size);
    let epoch = Instant::now();
    let clock_offset = calibrate(|| sample_real_triple(&epoch), 10);

    let native_symbols: Box<dyn NativeSymbols> = Box::new(kallsyms);
    let symbolizer: Box<dyn Symbolizer> = match (&config.sym_level, &config.debug_image) {
        (SymLevel::None, _) | (_, None) => Box::new(NullSymbolizer),
        (_, Some(path)) => Box::new(load_symbolizer(path)?),
    };

    runtime::run_loop(&transport, &table, &config.filter, clock_offset, native_symbols.as_ref(), symbolizer.as_ref(), config.full_stacks);
    Ok(())
}

fn install_probes(_config: &Config, _table: &FuncTable) -> Result<(), AttachError> {
    Err(AttachError::UnsupportedAttachMode("no in-kernel attach backend is compiled into this build"))
}

fn load_symbolizer(path: &Path) -> Result<DwarfSymbolizer, CliError> {
    Ok(DwarfSymbolizer::load(path)?)
}
