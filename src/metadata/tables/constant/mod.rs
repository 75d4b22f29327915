//! The `Constant` table (0x0B).
//!
//! Compile-time default values for fields, parameters and properties. The table is sorted by
//! its `parent` coded index; the resolver uses it to fill
//! [`crate::metadata::method::Parameter::default`] for parameters flagged `HAS_DEFAULT`.

mod raw;

pub use raw::*;
