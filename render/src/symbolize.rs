// SYMBOLIZATION SHIM
// ================================================================================================

/// One inlined frame contributing to a resolved address, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InlineFrame {
    pub function: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// What an address resolved to: the enclosing function/symbol, source location when debug info
/// is available, and any inlined frames the address also passes through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedFrame {
    pub function: Option<String>,
    /// Offset of the address from `function`'s entry, for the `NAME+OFF` rendering.
    pub offset: u64,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub inlines: Vec<InlineFrame>,
}

/// The narrow address-to-symbol interface the renderer needs from the backend.
///
/// One of the external collaborators named in SPEC_FULL.md §1 ("DWARF-based
/// address-to-line/inline resolver"); `retsnoop-backend` implements this over `addr2line`, and
/// tests use [`NullSymbolizer`] or a small in-memory stand-in.
pub trait Symbolizer {
    fn resolve(&self, addr: u64) -> ResolvedFrame;
}

/// A [`Symbolizer`] that never resolves anything, for `--dry-run` or unit tests that only care
/// about the reconciliation/filter logic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSymbolizer;

impl Symbolizer for NullSymbolizer {
    fn resolve(&self, _addr: u64) -> ResolvedFrame {
        ResolvedFrame::default()
    }
}

/// The lightweight `addr -> (name, base)` lookup used to match and name native kstack frames
/// (SPEC_FULL.md §4.5 step 4), backed by the kernel symbol table rather than DWARF — always
/// available, unlike [`Symbolizer`] which needs an optional debug image.
pub trait NativeSymbols {
    fn resolve(&self, addr: u64) -> Option<(String, u64)>;
}

/// A [`NativeSymbols`] that resolves nothing, for tests exercising only the merge/strip logic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNativeSymbols;

impl NativeSymbols for NullNativeSymbols {
    fn resolve(&self, _addr: u64) -> Option<(String, u64)> {
        None
    }
}
