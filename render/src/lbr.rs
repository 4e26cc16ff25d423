use retsnoop_engine::BranchSample;

// LBR TRIM & RENDER
// ================================================================================================

/// Range of addresses belonging to the leaf failing function, used to trim branch-stack noise
/// (SPEC_FULL.md §4.5 step 9).
#[derive(Debug, Clone, Copy)]
pub struct FuncRange {
    pub entry: u64,
    pub size: u64,
}

impl FuncRange {
    fn contains(&self, addr: u64) -> bool {
        addr >= self.entry && addr < self.entry + self.size
    }
}

/// What to print for the branch-stack section of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LbrRender<'a> {
    pub samples: &'a [BranchSample],
    /// `true` when no branch overlapped the leaf function and the full ring is shown instead
    /// (SPEC_FULL.md §9: "this spec treats 'no overlap' as 'render all and warn'").
    pub trimmed: bool,
}

/// Scans `samples` (newest first) for the first branch whose `from` or `to` falls inside
/// `leaf`'s address range, and returns the suffix starting there. Falls back to the full ring
/// with `trimmed = false` when nothing overlaps (SPEC_FULL.md §4.5 step 9, scenario S7).
pub fn trim(samples: &[BranchSample], leaf: FuncRange) -> LbrRender<'_> {
    let cut = samples.iter().position(|s| leaf.contains(s.from) || leaf.contains(s.to));
    match cut {
        Some(idx) => LbrRender { samples: &samples[idx..], trimmed: true },
        None => LbrRender { samples, trimmed: false },
    }
}
