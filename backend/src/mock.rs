use std::collections::HashMap;

use retsnoop_engine::{BranchSample, StackCapture, MAX_KSTACK_DEPTH, MAX_LBR_DEPTH};
use retsnoop_render::{NativeSymbols, ResolvedFrame, Symbolizer};

// MOCK BACKEND
// ================================================================================================

/// One fake symbol served by [`MockBackend`], covering `[addr, addr + size)`.
#[derive(Debug, Clone)]
struct FakeSymbol {
    addr: u64,
    size: u64,
    name: String,
    file: Option<String>,
    line: Option<u32>,
}

/// A hardware-free stand-in for the real backend, implementing every collaborator trait
/// (`StackCapture`, `NativeSymbols`, `Symbolizer`) over data supplied up front by the caller.
///
/// Used for `--dry-run` (SPEC_FULL.md §6: "plan and validate; do not attach") and for exercising
/// the full render pipeline in tests without real kernel stacks or branch hardware.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    symbols: Vec<FakeSymbol>,
    kernel_stacks: HashMap<u32, Vec<u64>>,
    branch_stacks: HashMap<u32, Vec<BranchSample>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a symbol covering `[addr, addr + size)` for both [`NativeSymbols`] and
    /// [`Symbolizer`] lookups.
    pub fn with_symbol(mut self, addr: u64, size: u64, name: impl Into<String>) -> Self {
        self.symbols.push(FakeSymbol { addr, size, name: name.into(), file: None, line: None });
        self
    }

    /// Same as [`MockBackend::with_symbol`], additionally attaching a source location.
    pub fn with_symbol_at(
        mut self,
        addr: u64,
        size: u64,
        name: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        self.symbols.push(FakeSymbol { addr, size, name: name.into(), file: Some(file.into()), line: Some(line) });
        self
    }

    /// Queues the raw addresses `capture_kernel_stack` should return the next time it is asked
    /// for `cpu`'s stack.
    pub fn with_kernel_stack(mut self, cpu: u32, addrs: Vec<u64>) -> Self {
        self.kernel_stacks.insert(cpu, addrs);
        self
    }

    /// Queues the branch samples `capture_branch_stack` should return for `cpu`.
    pub fn with_branch_stack(mut self, cpu: u32, samples: Vec<BranchSample>) -> Self {
        self.branch_stacks.insert(cpu, samples);
        self
    }

    fn find(&self, addr: u64) -> Option<&FakeSymbol> {
        self.symbols.iter().find(|s| addr >= s.addr && addr < s.addr + s.size)
    }
}

impl StackCapture for MockBackend {
    fn capture_kernel_stack(&self, cpu: u32, out: &mut [u64; MAX_KSTACK_DEPTH]) -> usize {
        let Some(addrs) = self.kernel_stacks.get(&cpu) else { return 0 };
        let n = addrs.len().min(out.len());
        out[..n].copy_from_slice(&addrs[..n]);
        n
    }

    fn capture_branch_stack(&self, cpu: u32, out: &mut [BranchSample; MAX_LBR_DEPTH]) -> usize {
        let Some(samples) = self.branch_stacks.get(&cpu) else { return 0 };
        let n = samples.len().min(out.len());
        out[..n].copy_from_slice(&samples[..n]);
        n
    }
}

impl NativeSymbols for MockBackend {
    fn resolve(&self, addr: u64) -> Option<(String, u64)> {
        self.find(addr).map(|s| (s.name.clone(), s.addr))
    }
}

impl Symbolizer for MockBackend {
    fn resolve(&self, addr: u64) -> ResolvedFrame {
        match self.find(addr) {
            Some(s) => ResolvedFrame {
                function: Some(s.name.clone()),
                offset: addr - s.addr,
                file: s.file.clone(),
                line: s.line,
                inlines: Vec::new(),
            },
            None => ResolvedFrame::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_symbols_by_range() {
        let backend = MockBackend::new().with_symbol_at(0x1000, 0x100, "bpf_map_alloc", "kernel/bpf/syscall.c", 42);
        let resolved = Symbolizer::resolve(&backend, 0x1040);
        assert_eq!(resolved.function.as_deref(), Some("bpf_map_alloc"));
        assert_eq!(resolved.offset, 0x40);
        assert_eq!(resolved.line, Some(42));
    }

    #[test]
    fn unregistered_address_resolves_to_nothing() {
        let backend = MockBackend::new();
        let resolved = Symbolizer::resolve(&backend, 0x9000);
        assert!(resolved.function.is_none());
        assert!(NativeSymbols::resolve(&backend, 0x9000).is_none());
    }

    #[test]
    fn queued_kernel_stack_is_replayed_once() {
        let backend = MockBackend::new().with_kernel_stack(0, vec![0x1000, 0x2000]);
        let mut out = [0u64; MAX_KSTACK_DEPTH];
        let n = backend.capture_kernel_stack(0, &mut out);
        assert_eq!(n, 2);
        assert_eq!(&out[..2], &[0x1000, 0x2000]);
    }

    #[test]
    fn branch_stack_defaults_to_empty_for_unconfigured_cpu() {
        let backend = MockBackend::new();
        let mut out = [BranchSample::default(); MAX_LBR_DEPTH];
        assert_eq!(backend.capture_branch_stack(3, &mut out), 0);
    }
}
