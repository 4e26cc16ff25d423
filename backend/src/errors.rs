use std::path::PathBuf;

// ATTACH ERROR
// ================================================================================================

/// Failures raised by the backend while attaching probes or reading runtime state, corresponding
/// to SPEC_FULL.md §7's `AttachError`.
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("failed to read kernel symbol table `{path}`: {source}")]
    KallsymsUnreadable { path: PathBuf, source: std::io::Error },
    #[error("no attachable kernel functions were found in `{0}`")]
    EmptyKallsyms(PathBuf),
    #[error("failed to open debug image `{path}`: {source}")]
    DebugImageUnreadable { path: PathBuf, source: std::io::Error },
    #[error("debug image `{0}` could not be parsed as an object file: {1}")]
    DebugImageMalformed(PathBuf, String),
    #[error("perf_event_open failed on cpu {cpu}: errno {errno}")]
    PerfEventOpenFailed { cpu: u32, errno: i32 },
    #[error("the backend rejected attaching function `{name}`: {reason}")]
    AttachRejected { name: String, reason: String },
    #[error("requested attach mode is unsupported on this kernel: {0}")]
    UnsupportedAttachMode(&'static str),
}
