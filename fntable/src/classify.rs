use crate::func::FuncFlags;

// RETURN TYPE
// ================================================================================================

/// Shape of a function's return type, as handed to us by the (out-of-scope) type-info reader.
///
/// `Modifier` chains (`const`, `typedef`, `volatile`, …) are represented separately so
/// [`classify`] can strip them before applying the classification rules, matching the spec's
/// requirement that modifiers and aliases be "transparent".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    /// No type information was available for this function at all.
    Unknown,
    Void,
    Pointer,
    Bool,
    /// Signed integer of the given byte width (1, 2, 4, or 8).
    SignedInt(u8),
    /// Unsigned integer of the given byte width.
    UnsignedInt(u8),
    /// A modifier or alias wrapping another type; transparent to classification.
    Modifier(Box<ReturnType>),
}

impl ReturnType {
    /// Strips away `Modifier` wrappers until a base type is reached.
    fn strip_modifiers(&self) -> &ReturnType {
        let mut cur = self;
        while let ReturnType::Modifier(inner) = cur {
            cur = inner;
        }
        cur
    }
}

// CLASSIFIER
// ================================================================================================

/// Derives the [`FuncFlags`] subset that describes how to interpret a function's return value.
///
/// Pure function of the (de-aliased) return type; holds no state and performs no I/O. See
/// SPEC_FULL.md §3 "Classification rules" for the table this implements.
pub fn classify(ret: &ReturnType) -> FuncFlags {
    match ret.strip_modifiers() {
        ReturnType::Unknown => FuncFlags::NEEDS_SIGN_EXT,
        ReturnType::Void => FuncFlags::CANT_FAIL | FuncFlags::RET_VOID,
        ReturnType::Pointer => FuncFlags::RET_PTR,
        ReturnType::Bool => FuncFlags::CANT_FAIL | FuncFlags::RET_BOOL,
        ReturnType::UnsignedInt(_) => FuncFlags::CANT_FAIL,
        ReturnType::SignedInt(width) if *width < 4 => FuncFlags::CANT_FAIL,
        ReturnType::SignedInt(4) => FuncFlags::NEEDS_SIGN_EXT,
        ReturnType::SignedInt(_) => FuncFlags::empty(),
        ReturnType::Modifier(_) => unreachable!("stripped above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_needs_sign_ext() {
        assert_eq!(classify(&ReturnType::Unknown), FuncFlags::NEEDS_SIGN_EXT);
    }

    #[test]
    fn void_cant_fail() {
        let flags = classify(&ReturnType::Void);
        assert!(flags.contains(FuncFlags::CANT_FAIL));
        assert!(flags.contains(FuncFlags::RET_VOID));
    }

    #[test]
    fn pointer_is_ret_ptr_only() {
        assert_eq!(classify(&ReturnType::Pointer), FuncFlags::RET_PTR);
    }

    #[test]
    fn bool_cant_fail() {
        let flags = classify(&ReturnType::Bool);
        assert!(flags.contains(FuncFlags::CANT_FAIL));
        assert!(flags.contains(FuncFlags::RET_BOOL));
    }

    #[test]
    fn unsigned_cant_fail() {
        assert_eq!(classify(&ReturnType::UnsignedInt(4)), FuncFlags::CANT_FAIL);
        assert_eq!(classify(&ReturnType::UnsignedInt(8)), FuncFlags::CANT_FAIL);
    }

    #[test]
    fn narrow_signed_cant_fail() {
        assert_eq!(classify(&ReturnType::SignedInt(1)), FuncFlags::CANT_FAIL);
        assert_eq!(classify(&ReturnType::SignedInt(2)), FuncFlags::CANT_FAIL);
    }

    #[test]
    fn signed32_needs_sign_ext() {
        assert_eq!(classify(&ReturnType::SignedInt(4)), FuncFlags::NEEDS_SIGN_EXT);
    }

    #[test]
    fn signed64_no_extra_flags() {
        assert_eq!(classify(&ReturnType::SignedInt(8)), FuncFlags::empty());
    }

    #[test]
    fn modifier_chain_is_transparent() {
        let aliased = ReturnType::Modifier(Box::new(ReturnType::Modifier(Box::new(ReturnType::Pointer))));
        assert_eq!(classify(&aliased), FuncFlags::RET_PTR);
    }
}
