//! The `MethodDef` table (0x06).
//!
//! One row per method defined in the module. Rows are ordered by owning type, and each row's
//! `param_list` column marks where its run of `Param` rows begins; the run ends where the next
//! method's run begins. [`crate::metadata::method::MethodDef`] builds on this raw row.

mod raw;

pub use raw::*;
