//! The kernel-facing half of retsnoop: symbol table loading, DWARF resolution, LBR sampling,
//! feature detection and clock calibration.
//!
//! Every type here implements a narrow trait defined upstream (`retsnoop_engine::StackCapture`,
//! `retsnoop_render::{Symbolizer, NativeSymbols}`) rather than exposing its own ad hoc API, so
//! the engine and renderer never need to know this crate exists.

pub mod calibrate;
pub mod dwarf;
pub mod errors;
pub mod features;
pub mod kallsyms;
pub mod lbr;
pub mod mock;

pub use calibrate::{calibrate, sample_real_triple, ClockOffset, Triple};
pub use dwarf::DwarfSymbolizer;
pub use errors::AttachError;
pub use features::Features;
pub use kallsyms::{KallsymsTable, KernelUniverse};
pub use lbr::LbrSampler;
pub use mock::MockBackend;
