//! The `Param` table (0x08).
//!
//! Optional per-parameter metadata. A row with `sequence == 0` describes the return value,
//! `sequence == n` describes the n-th declared parameter. Parameters without names, flags,
//! defaults or marshalling info usually have no row at all.

mod raw;

pub use raw::*;
