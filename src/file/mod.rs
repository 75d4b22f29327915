//! Binary primitives shared by the metadata readers.
//!
//! The module loader hands this crate raw table slices and heap bytes. Everything that
//! decodes those bytes goes through the two submodules here:
//!
//! - [`crate::file::io`] - bounds-checked little-endian reads and 2/4-byte index reads
//! - [`crate::file::parser::Parser`] - a cursor over signature blobs with compressed
//!   integer and token decoding

pub mod io;
pub mod parser;
