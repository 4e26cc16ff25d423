//! Per-CPU logical call-stack engine and the bounded transport that carries completed stacks to
//! user space.
//!
//! This crate is deliberately narrow about its collaborators: it neither attaches probes nor
//! reads hardware counters itself. [`capture::StackCapture`] and [`clock::Clock`] are the two
//! seams `retsnoop-backend` plugs into; everything in here can be driven and tested with plain
//! in-memory doubles, matching SPEC_FULL.md §1's "small, pure-logic core wrapped by thin I/O
//! shims".

pub mod callstack;
pub mod capture;
pub mod clock;
pub mod percpu;
pub mod transport;

pub use callstack::{BranchSample, CallStack, COMM_LEN, MAX_FSTACK_DEPTH, MAX_KSTACK_DEPTH, MAX_LBR_DEPTH};
pub use capture::{NullCapture, StackCapture};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use percpu::{EngineOutcome, PerCpuEngine};
pub use transport::{Transport, TransportSender};
