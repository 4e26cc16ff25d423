//! The attachment planner: turns entry/allow/deny globs into a concrete, de-duplicated
//! [`retsnoop_fntable::FuncTable`].
//!
//! Glob expansion (`@FILE`, `:CU`) and candidate resolution are pure with respect to the
//! [`candidate::SymbolUniverse`] the caller provides, so the planner itself never touches the
//! filesystem except to read `@FILE` glob lists.

mod candidate;
mod errors;
mod glob;
mod planner;

pub use candidate::{CandidateFunc, KnownReturnType, StaticUniverse, SymbolUniverse};
pub use errors::{ConfigError, PlanError};
pub use glob::{CompiledGlob, GlobSpec};
pub use planner::{plan, PlanRequest, PlanningError};
