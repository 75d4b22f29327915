use crate::metadata::token::Token;

/// A type as encoded in a signature blob (ECMA-335 §II.23.2.12).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypeSignature {
    /// Placeholder before parsing
    #[default]
    Unknown,
    /// `void`
    Void,
    /// `bool`
    Boolean,
    /// `char`
    Char,
    /// `int8`
    I1,
    /// `uint8`
    U1,
    /// `int16`
    I2,
    /// `uint16`
    U2,
    /// `int32`
    I4,
    /// `uint32`
    U4,
    /// `int64`
    I8,
    /// `uint64`
    U8,
    /// `float32`
    R4,
    /// `float64`
    R8,
    /// `string`
    String,
    /// Unmanaged pointer
    Ptr(SignaturePointer),
    /// Managed reference inside a type (not a by-ref parameter)
    ByRef(Box<TypeSignature>),
    /// Value type, `TypeDefOrRef` token
    ValueType(Token),
    /// Reference type, `TypeDefOrRef` token
    Class(Token),
    /// Generic parameter of the enclosing type (`!n`)
    GenericParamType(u32),
    /// General array
    Array(SignatureArray),
    /// Generic instantiation
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// `typedref`
    TypedByRef,
    /// `native int`
    I,
    /// `native uint`
    U,
    /// Function pointer
    FnPtr(Box<SignatureMethod>),
    /// `object`
    Object,
    /// Single-dimension, zero-based array
    SzArray(SignatureSzArray),
    /// Generic parameter of the enclosing method (`!!n`)
    GenericParamMethod(u32),
    /// Pinned local
    Pinned(Box<TypeSignature>),
}

/// Size and lower bound of one array dimension.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrayDimensions {
    /// Declared size, if any
    pub size: Option<u32>,
    /// Declared lower bound, if any
    pub lower_bound: Option<i32>,
}

/// A general (`ELEMENT_TYPE_ARRAY`) array.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureArray {
    /// Element type
    pub base: Box<TypeSignature>,
    /// Number of dimensions
    pub rank: u32,
    /// Dimensions that carry a size or lower bound
    pub dimensions: Vec<ArrayDimensions>,
}

/// A single-dimension, zero-based array.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureSzArray {
    /// Custom modifiers on the element type
    pub modifiers: Vec<Token>,
    /// Element type
    pub base: Box<TypeSignature>,
}

/// An unmanaged pointer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignaturePointer {
    /// Custom modifiers on the pointee
    pub modifiers: Vec<Token>,
    /// Pointee type
    pub base: Box<TypeSignature>,
}

/// A parameter or return type with its custom modifiers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureParameter {
    /// `modreq` tokens, in blob order
    pub required_modifiers: Vec<Token>,
    /// `modopt` tokens, in blob order
    pub optional_modifiers: Vec<Token>,
    /// Passed by reference
    pub by_ref: bool,
    /// The parameter type
    pub base: TypeSignature,
}

/// The calling convention in the low nibble of a method signature's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallingConvention {
    /// Managed default
    #[default]
    Default,
    /// `unmanaged cdecl`
    Cdecl,
    /// `unmanaged stdcall`
    Stdcall,
    /// `unmanaged thiscall`
    Thiscall,
    /// `unmanaged fastcall`
    Fastcall,
    /// Managed varargs
    Vararg,
}

/// A decoded method signature (ECMA-335 §II.23.2.1).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureMethod {
    /// Instance method
    pub has_this: bool,
    /// `this` is passed explicitly as the first parameter
    pub explicit_this: bool,
    /// The calling convention
    pub calling_convention: CallingConvention,
    /// Number of generic parameters, `0` for non-generic methods
    pub param_count_generic: u32,
    /// Return type
    pub return_type: SignatureParameter,
    /// Fixed parameters
    pub params: Vec<SignatureParameter>,
    /// Parameters after the vararg sentinel
    pub varargs: Vec<SignatureParameter>,
}
