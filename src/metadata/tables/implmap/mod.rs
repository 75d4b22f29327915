//! The `ImplMap` table (0x1C), the native forwarding map.
//!
//! Links a `MethodDef` (or `Field`) to an entry point in a native module named by a
//! `ModuleRef` row. Zero or one row exists per method. The decoded, high-level view of a
//! row is [`crate::metadata::interop::InteropDescriptor`].

mod raw;

pub use raw::*;

#[allow(non_snake_case)]
/// All possible flags for `PInvokeAttributes` (ECMA-335 §II.23.1.8), plus the best-fit and
/// char-map bits that compilers emit outside the standard.
pub mod PInvokeAttributes {
    /// Use the member name as specified
    pub const NO_MANGLE: u32 = 0x0001;
    /// Character set not specified
    pub const CHAR_SET_NOT_SPEC: u32 = 0x0000;
    /// Marshal strings as ANSI
    pub const CHAR_SET_ANSI: u32 = 0x0002;
    /// Marshal strings as UTF-16
    pub const CHAR_SET_UNICODE: u32 = 0x0004;
    /// Platform-dependent string marshalling
    pub const CHAR_SET_AUTO: u32 = 0x0006;
    /// Character set mask
    pub const CHAR_SET_MASK: u32 = 0x0006;
    /// The callee sets the last-error value
    pub const SUPPORTS_LAST_ERROR: u32 = 0x0040;
    /// Calling convention mask
    pub const CALL_CONV_MASK: u32 = 0x0700;
    /// Calling convention = `WinAPI`
    pub const CALL_CONV_WINAPI: u32 = 0x0100;
    /// Calling convention = C
    pub const CALL_CONV_CDECL: u32 = 0x0200;
    /// Calling convention = `StdCall`
    pub const CALL_CONV_STDCALL: u32 = 0x0300;
    /// Calling convention = `ThisCall`
    pub const CALL_CONV_THISCALL: u32 = 0x0400;
    /// Calling convention = `FastCall`
    pub const CALL_CONV_FASTCALL: u32 = 0x0500;
    /// Best fit mapping enabled
    pub const BEST_FIT_ENABLED: u32 = 0x0010;
    /// Best fit mapping disabled
    pub const BEST_FIT_DISABLED: u32 = 0x0020;
    /// Throw on unmappable chars enabled
    pub const THROW_ON_UNMAPPABLE_ENABLED: u32 = 0x1000;
    /// Throw on unmappable chars disabled
    pub const THROW_ON_UNMAPPABLE_DISABLED: u32 = 0x2000;
}
