// RENDER ERROR
// ================================================================================================

/// Failures the renderer can surface; per-frame symbolization misses degrade gracefully instead
/// of raising this (SPEC_FULL.md §7: "Per-frame symbolization failures degrade to printing only
/// the address and offset").
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("debug info was explicitly requested via -s but none is available")]
    DebugInfoRequiredButMissing,
}
