//! Lazy ECMA-335 metadata resolution.
//!
//! This module reconstructs methods, their parameters, generic parameters, signatures and
//! native bindings from the column-oriented metadata tables of a module, without
//! materializing the whole module. The module loader supplies the heaps and table slices;
//! everything is decoded on demand and cached per row.
//!
//! # Key Components
//!
//! - [`module::MetadataModule`] - The immutable store of one module's heaps and tables
//! - [`method::MethodDef`] - Lazy method entity with once-computed cells
//! - [`interop`] - `ImplMap` decoding and the synthesized `DllImport` attribute
//! - [`signatures`] - Method signature blob parsing
//! - [`streams`] - `#Strings` and `#Blob` heap views
//! - [`tables`] - Row definitions and the generic [`tables::MetadataTable`]
//! - [`token`] - Metadata table row references
//!
//! # Examples
//!
//! ```rust,ignore
//! use jcil::metadata::module::MetadataModule;
//!
//! let module = MetadataModule::new(info, strings, blob)?
//!     .with_table(TableId::MethodDef, method_rows)?
//!     .with_table(TableId::Param, param_rows)?;
//!
//! for method in module.methods() {
//!     let method = method?;
//!     println!("{} takes {} parameters", method.name()?, method.parameter_count()?);
//! }
//! # Ok::<(), jcil::Error>(())
//! ```

/// Native binding descriptors and the `DllImport` pseudo-attribute
pub mod interop;
/// Lazily resolved method definitions
pub mod method;
/// The immutable metadata store of one module
pub mod module;
/// Implementation of method and type signatures
pub mod signatures;
/// Implementation of the `#Strings` and `#Blob` heaps
pub mod streams;
/// Implementation of the .NET metadata tables
pub mod tables;
/// Commonly used metadata token type
pub mod token;
