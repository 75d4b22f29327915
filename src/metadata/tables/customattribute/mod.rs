//! The `CustomAttribute` table (0x0C).
//!
//! Declared attributes, sorted by their `parent` coded index. Attributes are surfaced as
//! constructor reference plus raw value blob; the synthesized interop attribute is appended
//! by [`crate::metadata::method::MethodDef::custom_attributes`].

mod raw;

pub use raw::*;
