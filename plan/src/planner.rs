use std::collections::BTreeSet;

use retsnoop_fntable::{classify, FuncFlags, FuncInfo, FuncTable, MAX_FUNCS};
use tracing::{debug, warn};

use crate::{
    candidate::{CandidateFunc, SymbolUniverse},
    errors::{ConfigError, PlanError},
    glob::{expand_file_globs, CompiledGlob, GlobSpec},
};

// PLAN REQUEST
// ================================================================================================

/// Everything the planner needs to resolve a run's entry/allow/deny globs into a [`FuncTable`].
#[derive(Debug, Clone, Default)]
pub struct PlanRequest {
    pub entry_globs: Vec<String>,
    pub allow_globs: Vec<String>,
    pub deny_globs: Vec<String>,
    /// Backend-imposed cap on the number of functions a single run may instrument (§4.1 step 6).
    pub max_functions: usize,
}

impl PlanRequest {
    pub fn new() -> Self {
        Self { max_functions: MAX_FUNCS, ..Default::default() }
    }
}

/// Combines [`ConfigError`] and [`PlanError`] so callers have a single `Result` to match on.
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

// PLANNER
// ================================================================================================

/// Resolves entry/allow/deny globs against `universe` into a dense, validated [`FuncTable`].
///
/// Implements SPEC_FULL.md §4.1 steps 1-6 in order: glob expansion, allow\deny set difference,
/// attachability filtering, deterministic ID assignment, return-type classification, and
/// validation.
pub fn plan(req: &PlanRequest, universe: &dyn SymbolUniverse) -> Result<FuncTable, PlanningError> {
    if req.entry_globs.is_empty() {
        return Err(ConfigError::EmptyEntrySet.into());
    }

    let entry_specs = parse_and_expand(&req.entry_globs, universe)?;
    let allow_specs = parse_and_expand(&req.allow_globs, universe)?;
    let deny_specs = parse_and_expand(&req.deny_globs, universe)?;

    let entry_globs: Vec<CompiledGlob> = entry_specs.iter().map(|s| CompiledGlob::new(s)).collect();
    // step 1: union entries into the allow set.
    let allow_globs: Vec<CompiledGlob> = allow_specs
        .iter()
        .chain(entry_specs.iter())
        .map(|s| CompiledGlob::new(s))
        .collect();
    let deny_globs: Vec<CompiledGlob> = deny_specs.iter().map(|s| CompiledGlob::new(s)).collect();

    // step 2+3: candidate set, dropping unattachable functions regardless of glob match.
    let mut candidates: Vec<&CandidateFunc> = universe
        .all_functions()
        .iter()
        .filter(|f| allow_globs.iter().any(|g| g.matches(&f.name)))
        .filter(|f| !deny_globs.iter().any(|g| g.matches(&f.name)))
        .collect();

    let dropped_unattachable = candidates.iter().filter(|f| !f.attachable).count();
    if dropped_unattachable > 0 {
        debug!(count = dropped_unattachable, "dropping non-attachable candidate functions");
    }
    candidates.retain(|f| f.attachable);

    // step 4: deterministic dense IDs, by name then address.
    candidates.sort_by(|a, b| a.name.cmp(&b.name).then(a.entry_address.cmp(&b.entry_address)));

    if candidates.len() > req.max_functions {
        return Err(PlanError::TooManyFunctions { count: candidates.len(), cap: req.max_functions }.into());
    }

    // step 5: classify + IS_ENTRY.
    let mut matched_entry_globs: BTreeSet<&str> = BTreeSet::new();
    let funcs: Vec<FuncInfo> = candidates
        .iter()
        .map(|f| {
            let mut flags = classify(&(&f.return_type).into());
            let is_entry = entry_globs.iter().any(|g| {
                let hit = g.matches(&f.name);
                if hit {
                    matched_entry_globs.insert(g.as_str());
                }
                hit
            });
            if is_entry {
                flags |= FuncFlags::IS_ENTRY;
            }
            FuncInfo::new(f.name.clone(), f.entry_address, f.body_size, flags)
        })
        .collect();

    // step 6: validation - every entry glob must have matched something.
    for glob in &entry_globs {
        if !matched_entry_globs.contains(glob.as_str()) {
            return Err(PlanError::EntryGlobUnmatched(glob.as_str().to_string()).into());
        }
    }

    Ok(FuncTable::from_ordered(funcs))
}

/// Parses raw CLI tokens, expands `@FILE` references, then expands any `:CU` tokens against
/// `universe` into the literal function names they name.
fn parse_and_expand(raw: &[String], universe: &dyn SymbolUniverse) -> Result<Vec<String>, PlanningError> {
    let specs: Vec<GlobSpec> = raw.iter().map(|s| GlobSpec::parse(s)).collect::<Result<_, _>>()?;
    let specs = expand_file_globs(specs)?;

    let mut out = Vec::with_capacity(specs.len());
    for spec in specs {
        match spec {
            GlobSpec::Pattern(p) => out.push(p),
            GlobSpec::CompileUnit(cu) => {
                let names = universe
                    .functions_in_compile_unit(&cu)
                    .ok_or_else(|| PlanError::UnknownCompileUnit(cu.clone()))?;
                out.extend(names);
            },
            GlobSpec::File(_) => {
                warn!("unexpanded @FILE glob reached the planner; treating as a no-op");
            },
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{KnownReturnType, StaticUniverse};

    fn cand(name: &str, attachable: bool, rt: KnownReturnType) -> CandidateFunc {
        CandidateFunc {
            name: name.to_string(),
            entry_address: 0x1000,
            body_size: 0x40,
            attachable,
            compile_unit: None,
            return_type: rt,
        }
    }

    #[test]
    fn basic_plan_marks_entries_and_classifies() {
        let universe = StaticUniverse::new(vec![
            cand("bpf_map_alloc", true, KnownReturnType::Pointer),
            cand("bpf_prog_load", true, KnownReturnType::SignedInt(4)),
            cand("sys_bpf", true, KnownReturnType::SignedInt(8)),
        ]);
        let req = PlanRequest {
            entry_globs: vec!["sys_bpf".into()],
            allow_globs: vec!["bpf_*".into()],
            deny_globs: vec![],
            max_functions: 100,
        };
        let table = plan(&req, &universe).unwrap();
        assert_eq!(table.len(), 3);
        let (_, sys_bpf) = table.iter().find(|(_, f)| f.name == "sys_bpf").unwrap();
        assert!(sys_bpf.flags.contains(FuncFlags::IS_ENTRY));
        let (_, alloc) = table.iter().find(|(_, f)| f.name == "bpf_map_alloc").unwrap();
        assert!(!alloc.flags.contains(FuncFlags::IS_ENTRY));
        assert!(alloc.flags.contains(FuncFlags::RET_PTR));
    }

    #[test]
    fn deny_glob_removes_matches() {
        let universe = StaticUniverse::new(vec![
            cand("bpf_map_alloc", true, KnownReturnType::Pointer),
            cand("bpf_map_free", true, KnownReturnType::Void),
        ]);
        let req = PlanRequest {
            entry_globs: vec!["bpf_map_alloc".into()],
            allow_globs: vec!["bpf_*".into()],
            deny_globs: vec!["*_free".into()],
            max_functions: 100,
        };
        let table = plan(&req, &universe).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().name, "bpf_map_alloc");
    }

    #[test]
    fn unattachable_candidates_are_dropped() {
        let universe = StaticUniverse::new(vec![
            cand("bpf_map_alloc", true, KnownReturnType::Pointer),
            cand("bpf_inlined_helper", false, KnownReturnType::Void),
        ]);
        let req = PlanRequest {
            entry_globs: vec!["bpf_map_alloc".into()],
            allow_globs: vec!["bpf_*".into()],
            deny_globs: vec![],
            max_functions: 100,
        };
        let table = plan(&req, &universe).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unmatched_entry_glob_is_an_error() {
        let universe = StaticUniverse::new(vec![cand("bpf_map_alloc", true, KnownReturnType::Pointer)]);
        let req = PlanRequest {
            entry_globs: vec!["sys_bpf".into()],
            allow_globs: vec!["bpf_*".into()],
            deny_globs: vec![],
            max_functions: 100,
        };
        let err = plan(&req, &universe).unwrap_err();
        assert!(matches!(err, PlanningError::Plan(PlanError::EntryGlobUnmatched(_))));
    }

    #[test]
    fn empty_entry_set_is_a_config_error() {
        let universe = StaticUniverse::new(vec![]);
        let req = PlanRequest::new();
        let err = plan(&req, &universe).unwrap_err();
        assert!(matches!(err, PlanningError::Config(ConfigError::EmptyEntrySet)));
    }

    #[test]
    fn too_many_functions_is_a_plan_error() {
        let universe = StaticUniverse::new(vec![
            cand("bpf_a", true, KnownReturnType::Void),
            cand("bpf_b", true, KnownReturnType::Void),
        ]);
        let req = PlanRequest {
            entry_globs: vec!["bpf_a".into()],
            allow_globs: vec!["bpf_*".into()],
            deny_globs: vec![],
            max_functions: 1,
        };
        let err = plan(&req, &universe).unwrap_err();
        assert!(matches!(err, PlanningError::Plan(PlanError::TooManyFunctions { .. })));
    }

    #[test]
    fn compile_unit_glob_expands_to_its_functions() {
        let mut a = cand("bpf_map_alloc", true, KnownReturnType::Pointer);
        a.compile_unit = Some("kernel/bpf/syscall.c".into());
        let mut b = cand("bpf_map_free", true, KnownReturnType::Void);
        b.compile_unit = Some("kernel/bpf/syscall.c".into());
        let universe = StaticUniverse::new(vec![a, b]);
        let req = PlanRequest {
            entry_globs: vec!["bpf_map_alloc".into()],
            allow_globs: vec![":kernel/bpf/syscall.c".into()],
            deny_globs: vec![],
            max_functions: 100,
        };
        let table = plan(&req, &universe).unwrap();
        assert_eq!(table.len(), 2);
    }
}
