//! The `GenericParam` table (0x2A).
//!
//! Rows are sorted by their `owner` coded index and then by `number`, so all parameters of one
//! generic type or method form a contiguous, ordinal-ordered run that can be located with a
//! lower-bound search.

mod raw;

pub use raw::*;
