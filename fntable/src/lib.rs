//! Function table, return-value classification, and errno data model shared by every other
//! retsnoop crate.
//!
//! This crate holds no I/O and no mutable global state: everything here is either a pure function
//! (the classifier, the error-value predicates) or an immutable value built once by the planner
//! (the [`FuncTable`]).

mod classify;
mod errno;
mod func;
mod mask;

pub use classify::{classify, ReturnType};
pub use errno::{errno_of, errno_of_name, is_err_value, is_err_value32, name_of_errno, render_errno, MAX_ERRNO};
pub use func::{FuncFlags, FuncId, FuncInfo, FuncTable, MAX_FUNCS};
pub use mask::ErrorMask;

/// Decides whether a function's return value represents failure, combining the classifier's
/// flags with the error-value predicates.
///
/// This is the single reference implementation invariant 4 in SPEC_FULL.md §8 is checked
/// against: `failed = not CANT_FAIL and ((NEEDS_SIGN_EXT and is_err_value32(ret)) or
/// (not NEEDS_SIGN_EXT and is_err_value(ret)) or (RET_PTR and ret == 0))`.
pub fn is_failure(flags: FuncFlags, ret: u64) -> bool {
    if flags.contains(FuncFlags::CANT_FAIL) {
        return false;
    }
    let numeric_failure = if flags.contains(FuncFlags::NEEDS_SIGN_EXT) {
        is_err_value32(ret)
    } else {
        is_err_value(ret)
    };
    let null_ptr_failure = flags.contains(FuncFlags::RET_PTR) && ret == 0;
    numeric_failure || null_ptr_failure
}
