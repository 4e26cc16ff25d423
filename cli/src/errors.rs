// CLI ERROR
// ================================================================================================

/// The only error type `main` matches on to pick an exit code (SPEC_FULL.md §7.1). Every other
/// crate returns its own boundary error; this just wires them together with `#[from]`.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Planning(#[from] retsnoop_plan::PlanningError),
    #[error(transparent)]
    Attach(#[from] retsnoop_backend::AttachError),
    #[error(transparent)]
    Render(#[from] retsnoop_render::RenderError),
    #[error("unknown error name `{0}`; expected a bare errno name like ENOENT or -ENOENT")]
    UnknownErrno(String),
}

impl CliError {
    /// Process exit code for this failure, matching SPEC_FULL.md §6's "non-zero with a one-line
    /// diagnostic on failure" (the exact non-zero value carries no meaning beyond "failed").
    pub fn exit_code(&self) -> i32 {
        1
    }
}
