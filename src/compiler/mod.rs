//! Bytecode to CIL translation with intrinsic call substitution.
//!
//! The translator walks a normalized method body ([`instruction`]) of a class being
//! compiled ([`classfile`]) and emits CIL through a [`emit::CodeEmitter`]. At every call
//! it asks the [`intrinsics::IntrinsicRegistry`] whether the callee is an intrinsic; if
//! so, the matching rule may replace the call with a specialized sequence, generating
//! helper types into the shared [`module::DynamicModule`] and deferring their creation
//! to the [`context::FinishContext`].
//!
//! # Key Components
//!
//! - [`translator::MethodTranslator`] - Drives translation of one method body
//! - [`intrinsics::IntrinsicRegistry`] - The table of substitution rules
//! - [`config::IntrinsicConfig`] - Compilation mode and trusted core library
//! - [`emit::CodeBuffer`] - Recording emitter
//! - [`analyzer::StackTypeOracle`] - Verifier-provided stack types
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use jcil::compiler::{
//!     analyzer::StaticStackTypes,
//!     classfile::ClassFile,
//!     config::{CoreLibrary, IntrinsicConfig},
//!     context::FinishContext,
//!     emit::CodeBuffer,
//!     instruction::{Instruction, NormalizedOpCode},
//!     intrinsics::IntrinsicRegistry,
//!     module::DynamicModule,
//!     translator::{MethodBody, MethodTranslator},
//!     types::{ClassLoader, JavaClass, JavaMethodFlags, MethodWrapper},
//! };
//!
//! let core = Arc::new(CoreLibrary::standard());
//! let registry = IntrinsicRegistry::new(IntrinsicConfig::static_compiler(core.clone()));
//!
//! let app = ClassLoader::scope("app", false);
//! let class = Arc::new(JavaClass::new("com.example.Main", &app));
//! let method = MethodWrapper::new(&class, "run", "(Ljava.lang.Object;)V", JavaMethodFlags::STATIC, 1);
//!
//! let mut class_file = ClassFile::new(&class);
//! let get_class = class_file.push_method(&core.method_wrapper(
//!     "java.lang.Object",
//!     "getClass",
//!     "()Ljava.lang.Class;",
//!     JavaMethodFlags::empty(),
//! )?);
//!
//! let mut code = vec![
//!     Instruction::new(0, NormalizedOpCode::Aload, 0),
//!     Instruction::new(1, NormalizedOpCode::Invokevirtual, get_class),
//!     Instruction::new(4, NormalizedOpCode::Pop, 0),
//!     Instruction::new(5, NormalizedOpCode::Return, 0),
//! ];
//!
//! let context = FinishContext::new(Arc::new(DynamicModule::new()));
//! let mut buffer = CodeBuffer::new();
//! let stats = MethodTranslator::new(&registry).translate(
//!     &context,
//!     &mut buffer,
//!     MethodBody {
//!         method: &method,
//!         class_file: &class_file,
//!         stack: &StaticStackTypes::new(),
//!         code: &mut code,
//!         flags: &[],
//!     },
//! )?;
//! assert_eq!(stats.substituted, 1);
//! # Ok::<(), jcil::Error>(())
//! ```

pub mod analyzer;
pub mod classfile;
pub mod config;
pub mod context;
pub mod emit;
pub mod instruction;
pub mod intrinsics;
pub mod module;
pub mod translator;
pub mod types;

/// Result of offering a call site to an intrinsic rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution {
    /// The call was replaced; nothing else must be emitted for it.
    Handled,
    /// The call was left alone and must be emitted normally.
    Declined,
}
