use std::path::PathBuf;

// CONFIG ERROR
// ================================================================================================

/// Errors that can be detected from the glob specification alone, before any kernel symbol
/// lookup happens.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no entry globs were given; retsnoop needs at least one -e to know where to start tracing")]
    EmptyEntrySet,
    #[error("unknown error name `{0}`; expected a bare errno name like ENOENT or -ENOENT")]
    UnknownErrno(String),
    #[error("failed to read glob file `{path}`: {source}")]
    GlobFileUnreadable { path: PathBuf, source: std::io::Error },
    #[error("empty glob pattern (a bare `-e`, `-a`, or `-d` with no pattern)")]
    EmptyGlob,
}

// PLAN ERROR
// ================================================================================================

/// Errors raised while resolving globs against the live kernel function universe.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("entry glob `{0}` did not match any attachable function")]
    EntryGlobUnmatched(String),
    #[error(
        "{count} functions matched the allow/deny globs, exceeding the backend cap of {cap}"
    )]
    TooManyFunctions { count: usize, cap: usize },
    #[error("compile unit `{0}` was not found while expanding a `:CU` glob")]
    UnknownCompileUnit(String),
}
