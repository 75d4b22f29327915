//! Attribute flags for methods and parameters.
//!
//! Raw `MethodDef` and `Param` columns are kept as plain integers in the row types; these
//! bitflags give them names once a [`crate::metadata::method::MethodDef`] is resolved.

use bitflags::bitflags;

/// Bitmask for member access extraction
pub const METHOD_ACCESS_MASK: u32 = 0x0007;
/// Bitmask for `CODE_TYPE` extraction
pub const METHOD_IMPL_CODE_TYPE_MASK: u32 = 0x0003;

bitflags! {
    /// `MethodAttributes` (ECMA-335 §II.23.1.10), without the access bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodAttributes: u32 {
        /// Method is exported through a native entry point
        const UNMANAGED_EXPORT = 0x0008;
        /// Defined on type, else per instance
        const STATIC = 0x0010;
        /// Method may not be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name+sig, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Always gets a new vtable slot
        const NEW_SLOT = 0x0100;
        /// Method can only be overridden if also accessible
        const STRICT = 0x0200;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Method is special
        const SPECIAL_NAME = 0x0800;
        /// CLI provides 'special' behavior, depending upon the name of the method
        const RTSPECIAL_NAME = 0x1000;
        /// Implementation is forwarded through `PInvoke`
        const PINVOKE_IMPL = 0x2000;
        /// Method has security associated with it
        const HAS_SECURITY = 0x4000;
        /// Method calls another method containing security code
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

impl MethodAttributes {
    /// Extract the modifier flags from a raw `MethodDef.Flags` value.
    #[must_use]
    pub fn from_method_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & !METHOD_ACCESS_MASK)
    }
}

/// Member access, the low three bits of `MethodDef.Flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodAccess {
    /// Member not referenceable
    CompilerControlled,
    /// Accessible only by the parent type
    Private,
    /// Accessible by sub-types only in this assembly
    FamilyAndAssembly,
    /// Accessible by anyone in the assembly
    Assembly,
    /// Accessible only by type and sub-types
    Family,
    /// Accessible by sub-types anywhere, plus anyone in assembly
    FamilyOrAssembly,
    /// Accessible by anyone who has visibility to this scope
    Public,
}

impl MethodAccess {
    /// Extract the access level from a raw `MethodDef.Flags` value.
    ///
    /// The reserved value `7` is reported as [`MethodAccess::CompilerControlled`].
    #[must_use]
    pub fn from_method_flags(flags: u32) -> Self {
        match flags & METHOD_ACCESS_MASK {
            1 => MethodAccess::Private,
            2 => MethodAccess::FamilyAndAssembly,
            3 => MethodAccess::Assembly,
            4 => MethodAccess::Family,
            5 => MethodAccess::FamilyOrAssembly,
            6 => MethodAccess::Public,
            _ => MethodAccess::CompilerControlled,
        }
    }
}

bitflags! {
    /// `MethodImplAttributes` (ECMA-335 §II.23.1.11).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodImplAttributes: u32 {
        /// Method impl is native (code type)
        const NATIVE = 0x0001;
        /// Method impl is OPTIL (code type)
        const OPTIL = 0x0002;
        /// Method impl is provided by the runtime (code type, both bits)
        const RUNTIME = 0x0003;
        /// Method impl is unmanaged, otherwise managed
        const UNMANAGED = 0x0004;
        /// Method cannot be inlined
        const NO_INLINING = 0x0008;
        /// Method is defined; used primarily in merge scenarios
        const FORWARD_REF = 0x0010;
        /// Method is single threaded through the body
        const SYNCHRONIZED = 0x0020;
        /// Method signature is not to be mangled to do HRESULT conversion
        const PRESERVE_SIG = 0x0080;
        /// Reserved for internal use
        const INTERNAL_CALL = 0x1000;
    }
}

impl MethodImplAttributes {
    /// `true` when the body is bytecode rather than native or runtime-provided code.
    #[must_use]
    pub fn is_il(&self) -> bool {
        self.bits() & METHOD_IMPL_CODE_TYPE_MASK == 0
    }
}

bitflags! {
    /// `ParamAttributes` (ECMA-335 §II.23.1.13).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParamAttributes: u32 {
        /// Param is `In`
        const IN = 0x0001;
        /// Param is `Out`
        const OUT = 0x0002;
        /// Param is optional
        const OPTIONAL = 0x0010;
        /// Param has a default value in the `Constant` table
        const HAS_DEFAULT = 0x1000;
        /// Param has `FieldMarshal`
        const HAS_FIELD_MARSHAL = 0x2000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_flags() {
        // public static hidebysig pinvokeimpl
        let raw = 0x2096;
        assert_eq!(MethodAccess::from_method_flags(raw), MethodAccess::Public);

        let attributes = MethodAttributes::from_method_flags(raw);
        assert!(attributes.contains(MethodAttributes::STATIC | MethodAttributes::PINVOKE_IMPL));
        assert!(!attributes.contains(MethodAttributes::VIRTUAL));
    }

    #[test]
    fn impl_flags() {
        let native = MethodImplAttributes::from_bits_truncate(0x0081);
        assert!(!native.is_il());
        assert!(native.contains(MethodImplAttributes::PRESERVE_SIG));

        assert!(MethodImplAttributes::from_bits_truncate(0x0020).is_il());
    }
}
