//! The `ModuleRef` table (0x1A).
//!
//! Names of external modules, used here as the import scope of native bindings.

mod raw;

pub use raw::*;
