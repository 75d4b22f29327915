//! # jcil Prelude
//!
//! Convenient re-exports of the most commonly used types and traits. Import this module
//! to get quick access to the metadata resolver and the bytecode translator.
//!
//! ```rust
//! use jcil::prelude::*;
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all jcil operations
pub use crate::Error;

/// The result type used throughout jcil
pub use crate::Result;

/// Low-level blob parsing
pub use crate::Parser;

// ================================================================================================
// Metadata
// ================================================================================================

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Heap views
pub use crate::metadata::streams::{Blob, Strings};

/// Table access and sizing
pub use crate::metadata::tables::{MetadataTable, TableId, TableInfo, TableInfoRef};

/// The module store and its counters
pub use crate::metadata::module::{MetadataModule, ResolverStatsSnapshot};

/// Lazily resolved methods
pub use crate::metadata::method::{GenericParameter, MethodAccess, MethodDef, Parameter};

/// Native bindings
pub use crate::metadata::interop::{CharSet, CustomAttributeData, InteropDescriptor};

/// Method signatures
pub use crate::metadata::signatures::{parse_method_signature, SignatureMethod, TypeSignature};

// ================================================================================================
// Compiler
// ================================================================================================

/// Java-side type model
pub use crate::compiler::types::{ClassLoader, JavaClass, LoaderScope, MethodWrapper};

/// Bytecode model
pub use crate::compiler::{
    classfile::{ClassFile, Constant},
    instruction::{Instruction, InstructionFlags, NormalizedOpCode},
};

/// Emission boundary
pub use crate::compiler::emit::{CilOpCode, CodeBuffer, CodeEmitter, EmittedOp, Operand};

/// Generated types and deferred finalization
pub use crate::compiler::{context::FinishContext, module::DynamicModule};

/// Intrinsic substitution
pub use crate::compiler::{
    analyzer::{StackTypeOracle, StaticStackTypes},
    config::{CoreLibrary, IntrinsicConfig},
    intrinsics::{IntrinsicKey, IntrinsicRegistry, IntrinsicRule},
    translator::{MethodBody, MethodTranslator, TranslationStats},
    Substitution,
};
