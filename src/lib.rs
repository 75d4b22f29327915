// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
#![deny(unsafe_code)]

//! # jcil
//!
//! The core of an ahead-of-time translator from JVM bytecode to CIL.
//!
//! `jcil` has two halves that meet at the translator:
//!
//! - a lazy reader for ECMA-335 metadata tables that reconstructs methods, their
//!   parameters, generic parameters, signatures and P/Invoke bindings on demand, caching
//!   each result once per method and sharing it across threads;
//! - a peephole engine that looks at the instructions around each call site and replaces
//!   calls to well-known core-library methods with specialized CIL, falling back to a
//!   regular call whenever a precondition does not hold.
//!
//! ## Quick Start
//!
//! ### Resolving a method
//!
//! ```rust
//! use jcil::metadata::module::MetadataModule;
//! # use jcil::metadata::tables::{TableId, TableInfo};
//! # use std::sync::Arc;
//! # fn load() -> jcil::Result<()> {
//! # let info = Arc::new(TableInfo::from_row_counts(&[(TableId::MethodDef, 0)], false, false, false));
//! # let strings = [0u8];
//! # let blob = [0u8];
//! let module = MetadataModule::new(info, &strings, &blob)?;
//!
//! for method in module.methods() {
//!     let method = method?;
//!     println!("{} takes {} parameters", method.name()?, method.parameter_count()?);
//! }
//! # Ok(())
//! # }
//! # load().unwrap();
//! ```
//!
//! ### Translating a method body
//!
//! See the [`compiler`] module for a complete example driving
//! [`compiler::translator::MethodTranslator`].
//!
//! ## Architecture
//!
//! - [`metadata`] - Heaps, tables, signatures and the lazy method resolver
//! - [`compiler`] - Instruction model, emitter boundary, intrinsic registry and translator
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Concurrency
//!
//! A [`metadata::module::MetadataModule`] and an
//! [`compiler::intrinsics::IntrinsicRegistry`] are `Sync`. Methods of one module can be
//! resolved from several threads at once; each lazily computed value is published once
//! and every thread observes the same value. Translations of different methods may share
//! one registry, one [`compiler::module::DynamicModule`] and one
//! [`compiler::context::FinishContext`].
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result`]. Errors are fatal for the translation
//! that raised them; a rule that merely does not apply is not an error.
//!
//! ```rust
//! use jcil::Error;
//!
//! fn describe(err: &Error) -> String {
//!     match err {
//!         Error::Malformed { message, .. } => format!("corrupt metadata: {message}"),
//!         other => other.to_string(),
//!     }
//! }
//! # let _ = describe(&Error::OutOfBounds);
//! ```
//!
//! ## Standards Compliance
//!
//! Table layouts, coded indexes, signature encodings and `ImplMap` flags follow the
//! **ECMA-335 specification** (6th edition).
//!
//! - [ECMA-335 Standard](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)
#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Bounds-checked binary reads and the signature blob parser.
pub mod file;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use jcil::prelude::*;
///
/// let core = std::sync::Arc::new(CoreLibrary::standard());
/// let registry = IntrinsicRegistry::new(IntrinsicConfig::static_compiler(core));
/// assert!(!registry.is_empty());
/// ```
pub mod prelude;

/// ECMA-335 metadata: heaps, tables, signatures and lazy method resolution.
///
/// # Key Components
///
/// - [`metadata::module::MetadataModule`] - The immutable store of one module's tables
/// - [`metadata::method::MethodDef`] - A method row with lazily resolved details
/// - [`metadata::interop::InteropDescriptor`] - Decoded P/Invoke binding
/// - [`metadata::tables::MetadataTable`] - Typed, 1-based row access to one table
/// - [`metadata::signatures`] - Method signature decoding
pub mod metadata;

/// JVM bytecode to CIL translation with intrinsic call substitution.
///
/// # Key Components
///
/// - [`compiler::translator::MethodTranslator`] - Translates one method body
/// - [`compiler::intrinsics::IntrinsicRegistry`] - Recognizes and replaces intrinsic calls
/// - [`compiler::emit::CodeEmitter`] - The backend boundary
/// - [`compiler::context::FinishContext`] - Deferred creation of generated types
pub mod compiler;

/// `jcil` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `jcil` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// Metadata heaps, see [`metadata::streams`].
pub use metadata::streams::{Blob, Strings};

/// Cursor over signature blobs, see [`file::parser`].
pub use file::parser::Parser;
