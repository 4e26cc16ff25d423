use std::{fs, path::PathBuf};

use crate::errors::ConfigError;

// GLOB SPECIFICATION
// ================================================================================================

/// One `-e`/`-a`/`-d` argument, before expansion.
///
/// The CLI layer hands these to [`expand`] in the order they were given; `@FILE` and `:CU` forms
/// are expanded before the allow/deny set-difference in the planner runs (SPEC_FULL.md §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobSpec {
    /// A plain shell-style glob matched against function names (`*`, `?`, `[...]`).
    Pattern(String),
    /// `@FILE`: read newline/whitespace-separated glob patterns from `FILE`.
    File(PathBuf),
    /// `:CU`: expand to every function defined in the named compile unit.
    CompileUnit(String),
}

impl GlobSpec {
    /// Parses one raw CLI token into a [`GlobSpec`].
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.is_empty() {
            return Err(ConfigError::EmptyGlob);
        }
        if let Some(path) = raw.strip_prefix('@') {
            if path.is_empty() {
                return Err(ConfigError::EmptyGlob);
            }
            return Ok(GlobSpec::File(PathBuf::from(path)));
        }
        if let Some(cu) = raw.strip_prefix(':') {
            if cu.is_empty() {
                return Err(ConfigError::EmptyGlob);
            }
            return Ok(GlobSpec::CompileUnit(cu.to_string()));
        }
        Ok(GlobSpec::Pattern(raw.to_string()))
    }
}

/// A single compiled glob pattern over function names, backed by [`glob::Pattern`].
#[derive(Debug, Clone)]
pub struct CompiledGlob {
    raw: String,
    pattern: glob::Pattern,
}

impl CompiledGlob {
    pub fn new(raw: &str) -> Self {
        // Function-name globs are never invalid shell patterns in practice (no `/`-sensitive
        // matching is needed); fall back to a pattern that matches nothing on the rare malformed
        // input rather than panicking the planner.
        let pattern = glob::Pattern::new(raw).unwrap_or_else(|_| {
            glob::Pattern::new("\0no-such-function\0").expect("literal pattern is always valid")
        });
        Self { raw: raw.to_string(), pattern }
    }

    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        self.pattern.matches(name)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Flattens a list of raw `-e`/`-a`/`-d` tokens into concrete, plain glob patterns by reading any
/// `@FILE` references (recursively: a file may itself contain `@other-file` tokens).
///
/// `:CU` tokens are passed through unexpanded here; they need the kernel's compile-unit index,
/// which only the planner (with a [`crate::candidate::SymbolUniverse`] in hand) can resolve.
pub fn expand_file_globs(specs: Vec<GlobSpec>) -> Result<Vec<GlobSpec>, ConfigError> {
    let mut out = Vec::with_capacity(specs.len());
    for spec in specs {
        expand_one(spec, &mut out, 0)?;
    }
    Ok(out)
}

/// Bails out rather than looping forever on a cyclic `@FILE` chain.
const MAX_FILE_EXPANSION_DEPTH: usize = 16;

fn expand_one(spec: GlobSpec, out: &mut Vec<GlobSpec>, depth: usize) -> Result<(), ConfigError> {
    match spec {
        GlobSpec::File(path) if depth < MAX_FILE_EXPANSION_DEPTH => {
            let contents = fs::read_to_string(&path)
                .map_err(|source| ConfigError::GlobFileUnreadable { path: path.clone(), source })?;
            for token in contents.split_whitespace() {
                expand_one(GlobSpec::parse(token)?, out, depth + 1)?;
            }
            Ok(())
        },
        GlobSpec::File(path) => {
            // depth exhausted: surface the file as an unreadable reference rather than expand
            // indefinitely.
            Err(ConfigError::GlobFileUnreadable {
                path,
                source: std::io::Error::new(std::io::ErrorKind::Other, "glob file nesting too deep"),
            })
        },
        other => {
            out.push(other);
            Ok(())
        },
    }
}
