use retsnoop_fntable::ReturnType;

// CANDIDATE FUNCTION
// ================================================================================================

/// One attachable kernel function, as reported by the (out-of-scope) kernel symbol/type
/// universe.
///
/// This is the narrow shape the planner needs; it deliberately does not carry anything the
/// planner does not consume (DWARF line tables, full type trees, …) so a test double can be
/// built from a handful of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFunc {
    pub name: String,
    pub entry_address: u64,
    pub body_size: u64,
    /// `false` for optimized-out, blacklisted, or ambiguous multi-instance symbols; the planner
    /// drops these in step 3 even if a glob matches them.
    pub attachable: bool,
    pub compile_unit: Option<String>,
    pub return_type: KnownReturnType,
}

/// A return-type signature the planner can turn into a [`ReturnType`], or `Unknown` when no type
/// info was available for the function at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownReturnType {
    Unknown,
    Void,
    Pointer,
    Bool,
    SignedInt(u8),
    UnsignedInt(u8),
}

impl From<&KnownReturnType> for ReturnType {
    fn from(k: &KnownReturnType) -> Self {
        match k {
            KnownReturnType::Unknown => ReturnType::Unknown,
            KnownReturnType::Void => ReturnType::Void,
            KnownReturnType::Pointer => ReturnType::Pointer,
            KnownReturnType::Bool => ReturnType::Bool,
            KnownReturnType::SignedInt(w) => ReturnType::SignedInt(*w),
            KnownReturnType::UnsignedInt(w) => ReturnType::UnsignedInt(*w),
        }
    }
}

// SYMBOL UNIVERSE
// ================================================================================================

/// The live kernel symbol/type universe the planner resolves globs against.
///
/// Implemented by `retsnoop-backend` over `/proc/kallsyms` plus whatever type info is available;
/// a planner test only needs an in-memory `Vec<CandidateFunc>` wrapped in [`StaticUniverse`].
pub trait SymbolUniverse {
    /// All functions the backend could plausibly attach to, attachable or not (non-attachable
    /// ones are listed so a matching-but-unattachable glob can still be diagnosed).
    fn all_functions(&self) -> &[CandidateFunc];

    /// Names of every function defined in compile unit `cu`, for `:CU` glob expansion.
    fn functions_in_compile_unit(&self, cu: &str) -> Option<Vec<String>>;
}

/// A [`SymbolUniverse`] backed by an in-memory vector, used by tests and by `--dry-run` when no
/// live kernel is available.
#[derive(Debug, Default)]
pub struct StaticUniverse {
    funcs: Vec<CandidateFunc>,
}

impl StaticUniverse {
    pub fn new(funcs: Vec<CandidateFunc>) -> Self {
        Self { funcs }
    }
}

impl SymbolUniverse for StaticUniverse {
    fn all_functions(&self) -> &[CandidateFunc] {
        &self.funcs
    }

    fn functions_in_compile_unit(&self, cu: &str) -> Option<Vec<String>> {
        let names: Vec<String> = self
            .funcs
            .iter()
            .filter(|f| f.compile_unit.as_deref() == Some(cu))
            .map(|f| f.name.clone())
            .collect();
        if names.is_empty() { None } else { Some(names) }
    }
}
