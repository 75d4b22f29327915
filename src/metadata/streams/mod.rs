//! Metadata heaps consumed by the resolver.
//!
//! Only the two heaps that method resolution reads are exposed: [`Strings`] for names
//! and [`Blob`] for signatures, constants and attribute values.

mod blob;
mod strings;

pub use blob::Blob;
pub use strings::Strings;
