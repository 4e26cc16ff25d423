use bitflags::bitflags;

// FUNCTION ID
// ================================================================================================

/// Dense, stable identifier assigned to an instrumented kernel function.
///
/// IDs are assigned by the attachment planner in `0..N` order and never change for the lifetime
/// of a run; the table built from them is immutable once the planner hands it off.
pub type FuncId = u32;

/// Upper bound on the number of functions a single run may instrument.
///
/// Dense IDs must fit a `u16` on the probe side, so the table can never grow past this.
pub const MAX_FUNCS: usize = 64 * 1024;

bitflags! {
    /// Per-function flags describing how to interpret a function's return value and its role
    /// in the traced call graph.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FuncFlags: u16 {
        /// Function may start a traced logical stack.
        const IS_ENTRY       = 1 << 0;
        /// Return value can never indicate failure (e.g. `void`, `bool`, unsigned).
        const CANT_FAIL      = 1 << 1;
        /// Return value must be sign-extended from 32 bits before comparing to the errno band.
        const NEEDS_SIGN_EXT = 1 << 2;
        /// Return value is a pointer; `NULL` is treated as failure.
        const RET_PTR        = 1 << 3;
        /// Function returns `void`.
        const RET_VOID       = 1 << 4;
        /// Function returns `bool`.
        const RET_BOOL       = 1 << 5;
    }
}

// FUNCTION INFO
// ================================================================================================

/// Static metadata about one instrumented kernel function.
///
/// Built once by the planner from the kernel symbol/type universe and never mutated afterwards;
/// every crate downstream of planning sees `FuncInfo` only through a shared, read-only
/// [`FuncTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncInfo {
    pub name: String,
    pub entry_address: u64,
    pub body_size: u64,
    pub flags: FuncFlags,
}

impl FuncInfo {
    pub fn new(name: impl Into<String>, entry_address: u64, body_size: u64, flags: FuncFlags) -> Self {
        Self { name: name.into(), entry_address, body_size, flags }
    }

    /// Returns `true` if `addr` falls within this function's instruction range.
    #[inline]
    pub fn contains_addr(&self, addr: u64) -> bool {
        addr >= self.entry_address && addr < self.entry_address + self.body_size
    }
}

// FUNCTION TABLE
// ================================================================================================

/// The immutable `FuncId -> FuncInfo` mapping produced by the planner.
///
/// Construction is the planner's job ([`retsnoop_plan`](https://docs.rs/retsnoop-plan)); this
/// type only owns the finished table and the accessors every other component needs.
#[derive(Debug, Clone, Default)]
pub struct FuncTable {
    funcs: Vec<FuncInfo>,
}

impl FuncTable {
    /// Builds a table from already-ordered, already-deduplicated function infos.
    ///
    /// Callers (the planner) are responsible for dense ID assignment: `FuncId` `i` refers to
    /// `funcs[i]`.
    pub fn from_ordered(funcs: Vec<FuncInfo>) -> Self {
        Self { funcs }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    #[inline]
    pub fn get(&self, id: FuncId) -> Option<&FuncInfo> {
        self.funcs.get(id as usize)
    }

    #[inline]
    pub fn flags(&self, id: FuncId) -> FuncFlags {
        self.get(id).map(|f| f.flags).unwrap_or(FuncFlags::empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (FuncId, &FuncInfo)> {
        self.funcs.iter().enumerate().map(|(i, f)| (i as FuncId, f))
    }

    /// Finds the function whose `[entry_address, entry_address + body_size)` range contains
    /// `addr`, if any. Used by the renderer to map a raw kernel address back to a `FuncId`.
    pub fn find_by_addr(&self, addr: u64) -> Option<(FuncId, &FuncInfo)> {
        self.iter().find(|(_, f)| f.contains_addr(addr))
    }
}
