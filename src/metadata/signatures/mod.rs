//! Method signature decoding (ECMA-335 §II.23.2).
//!
//! Signatures are stored in the `#Blob` heap and parsed once per method, on first access to
//! [`crate::metadata::method::MethodDef::signature`]. The parser keeps `modreq` and `modopt`
//! modifiers apart, since the translator treats required modifiers as part of a parameter's
//! identity and optional ones as annotations.
//!
//! # Examples
//!
//! ```rust
//! use jcil::metadata::signatures::{parse_method_signature, TypeSignature};
//!
//! // instance bool (int32)
//! let sig = parse_method_signature(&[0x20, 0x01, 0x02, 0x08])?;
//! assert!(sig.has_this);
//! assert_eq!(sig.return_type.base, TypeSignature::Boolean);
//! assert_eq!(sig.params[0].base, TypeSignature::I4);
//! # Ok::<(), jcil::Error>(())
//! ```

mod parser;
mod types;

pub use parser::*;
pub use types::*;

use crate::Result;

#[allow(non_snake_case)]
/// Element type tags used in signature and constant blobs (ECMA-335 §II.23.1.16).
pub mod ELEMENT_TYPE {
    /// Marks end of a list
    pub const END: u8 = 0x00;
    /// `void`
    pub const VOID: u8 = 0x01;
    /// `bool`
    pub const BOOLEAN: u8 = 0x02;
    /// `char`
    pub const CHAR: u8 = 0x03;
    /// `int8`
    pub const I1: u8 = 0x04;
    /// `uint8`
    pub const U1: u8 = 0x05;
    /// `int16`
    pub const I2: u8 = 0x06;
    /// `uint16`
    pub const U2: u8 = 0x07;
    /// `int32`
    pub const I4: u8 = 0x08;
    /// `uint32`
    pub const U4: u8 = 0x09;
    /// `int64`
    pub const I8: u8 = 0x0a;
    /// `uint64`
    pub const U8: u8 = 0x0b;
    /// `float32`
    pub const R4: u8 = 0x0c;
    /// `float64`
    pub const R8: u8 = 0x0d;
    /// `string`
    pub const STRING: u8 = 0x0e;
    /// Followed by type
    pub const PTR: u8 = 0x0f;
    /// Followed by type
    pub const BYREF: u8 = 0x10;
    /// Followed by `TypeDef` or `TypeRef` token
    pub const VALUETYPE: u8 = 0x11;
    /// Followed by `TypeDef` or `TypeRef` token
    pub const CLASS: u8 = 0x12;
    /// Generic parameter in a generic type definition
    pub const VAR: u8 = 0x13;
    /// type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    /// Generic type instantiation
    pub const GENERICINST: u8 = 0x15;
    /// `typedref`
    pub const TYPEDBYREF: u8 = 0x16;
    /// `System.IntPtr`
    pub const I: u8 = 0x18;
    /// `System.UIntPtr`
    pub const U: u8 = 0x19;
    /// Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    /// `System.Object`
    pub const OBJECT: u8 = 0x1c;
    /// Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    /// Generic parameter in a generic method definition
    pub const MVAR: u8 = 0x1e;
    /// Required modifier, followed by a `TypeDef` or `TypeRef` token
    pub const CMOD_REQD: u8 = 0x1f;
    /// Optional modifier, followed by a `TypeDef` or `TypeRef` token
    pub const CMOD_OPT: u8 = 0x20;
    /// Sentinel for vararg method signature
    pub const SENTINEL: u8 = 0x41;
    /// Denotes a local variable that points at a pinned object
    pub const PINNED: u8 = 0x45;
}

/// Parse a method signature blob.
///
/// # Errors
/// See [`SignatureParser::parse_method_signature`].
pub fn parse_method_signature(data: &[u8]) -> Result<SignatureMethod> {
    let mut parser = SignatureParser::new(data);
    parser.parse_method_signature()
}
