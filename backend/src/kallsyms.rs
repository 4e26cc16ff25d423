use std::{fs, path::{Path, PathBuf}};

use retsnoop_plan::{CandidateFunc, KnownReturnType, SymbolUniverse};
use retsnoop_render::NativeSymbols;
use tracing::debug;

use crate::errors::AttachError;

// KALLSYMS TABLE
// ================================================================================================

/// One parsed `/proc/kallsyms` line: address, symbol type char (`t`/`T` for text, lowercase is
/// local), and name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Symbol {
    addr: u64,
    kind: char,
    name: String,
}

/// An address-sorted kernel symbol table, loaded once at startup.
///
/// This is the out-of-scope "kernel-symbol table loader" named in SPEC_FULL.md §1: it only
/// answers `addr -> {name, base}` and produces the [`CandidateFunc`] universe the planner resolves
/// globs against. Return-type classification beyond "has a type at all" is out of scope here
/// (SPEC_FULL.md's type-info reader is a separate, narrower collaborator); every candidate is
/// reported with [`KnownReturnType::Unknown`], which the classifier maps to `NEEDS_SIGN_EXT` by
/// default (SPEC_FULL.md §3: "No type info -> NEEDS_SIGN_EXT").
#[derive(Debug, Default)]
pub struct KallsymsTable {
    symbols: Vec<Symbol>,
}

impl KallsymsTable {
    /// Parses a `/proc/kallsyms`-formatted file: `ADDR TYPE NAME [MODULE]` per line.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AttachError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path)
            .map_err(|source| AttachError::KallsymsUnreadable { path: path.clone(), source })?;
        Self::parse(&contents, &path)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, AttachError> {
        let mut symbols = Vec::new();
        for line in contents.lines() {
            let mut fields = line.split_whitespace();
            let (Some(addr), Some(kind), Some(name)) = (fields.next(), fields.next(), fields.next()) else {
                continue;
            };
            let Ok(addr) = u64::from_str_radix(addr, 16) else { continue };
            let Some(kind) = kind.chars().next() else { continue };
            symbols.push(Symbol { addr, kind, name: name.to_string() });
        }
        symbols.sort_by_key(|s| s.addr);
        if symbols.is_empty() {
            return Err(AttachError::EmptyKallsyms(path.to_path_buf()));
        }
        debug!(count = symbols.len(), "loaded kernel symbol table");
        Ok(Self { symbols })
    }

    /// Resolves `addr` to the nearest symbol at or below it, and that symbol's base address, for
    /// native-stack symbolization (SPEC_FULL.md §4.5 step 7).
    pub fn resolve(&self, addr: u64) -> Option<(&str, u64)> {
        let idx = self.symbols.partition_point(|s| s.addr <= addr);
        if idx == 0 {
            return None;
        }
        let sym = &self.symbols[idx - 1];
        Some((&sym.name, sym.addr))
    }

    fn is_text(kind: char) -> bool {
        matches!(kind, 't' | 'T')
    }

    /// Builds the planner-facing [`CandidateFunc`] universe from every text symbol, sizing each
    /// function's body as the gap to the next symbol of any kind (kallsyms carries no explicit
    /// size field).
    pub fn candidates(&self) -> Vec<CandidateFunc> {
        let mut out = Vec::with_capacity(self.symbols.len());
        for (i, sym) in self.symbols.iter().enumerate() {
            if !Self::is_text(sym.kind) {
                continue;
            }
            let next_addr = self.symbols.get(i + 1).map(|s| s.addr).unwrap_or(sym.addr + 1);
            out.push(CandidateFunc {
                name: sym.name.clone(),
                entry_address: sym.addr,
                body_size: next_addr.saturating_sub(sym.addr).max(1),
                attachable: true,
                compile_unit: None,
                return_type: KnownReturnType::Unknown,
            });
        }
        out
    }
}

impl NativeSymbols for KallsymsTable {
    fn resolve(&self, addr: u64) -> Option<(String, u64)> {
        self.resolve(addr).map(|(name, base)| (name.to_string(), base))
    }
}

// KERNEL UNIVERSE
// ================================================================================================

/// A [`SymbolUniverse`] backed by a loaded [`KallsymsTable`], handed to `retsnoop_plan::plan` by
/// the CLI at startup.
pub struct KernelUniverse {
    candidates: Vec<CandidateFunc>,
}

impl KernelUniverse {
    pub fn new(table: &KallsymsTable) -> Self {
        Self { candidates: table.candidates() }
    }
}

impl SymbolUniverse for KernelUniverse {
    fn all_functions(&self) -> &[CandidateFunc] {
        &self.candidates
    }

    fn functions_in_compile_unit(&self, _cu: &str) -> Option<Vec<String>> {
        // kallsyms carries no compile-unit information; `:CU` globs need the DWARF resolver,
        // which is wired in by the CLI when a debug image (`-k`) is supplied.
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
ffffffff81000000 T sys_bpf
ffffffff81000100 t bpf_map_alloc
ffffffff81000180 T bpf_map_free
ffffffff81000200 d some_data
";

    #[test]
    fn parses_text_symbols_and_sorts_by_address() {
        let table = KallsymsTable::parse(SAMPLE, Path::new("kallsyms")).unwrap();
        assert_eq!(table.symbols.len(), 4);
        assert_eq!(table.symbols[0].name, "sys_bpf");
    }

    #[test]
    fn resolve_finds_nearest_symbol_at_or_below() {
        let table = KallsymsTable::parse(SAMPLE, Path::new("kallsyms")).unwrap();
        let (name, base) = table.resolve(0xffffffff81000150).unwrap();
        assert_eq!(name, "bpf_map_alloc");
        assert_eq!(base, 0xffffffff81000100);
    }

    #[test]
    fn resolve_below_first_symbol_is_none() {
        let table = KallsymsTable::parse(SAMPLE, Path::new("kallsyms")).unwrap();
        assert!(table.resolve(0x100).is_none());
    }

    #[test]
    fn candidates_only_include_text_symbols_and_size_to_next() {
        let table = KallsymsTable::parse(SAMPLE, Path::new("kallsyms")).unwrap();
        let candidates = table.candidates();
        assert_eq!(candidates.len(), 3);
        let alloc = candidates.iter().find(|c| c.name == "bpf_map_alloc").unwrap();
        assert_eq!(alloc.body_size, 0x80);
        assert!(matches!(alloc.return_type, KnownReturnType::Unknown));
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = KallsymsTable::parse("", Path::new("kallsyms")).unwrap_err();
        assert!(matches!(err, AttachError::EmptyKallsyms(_)));
    }
}
