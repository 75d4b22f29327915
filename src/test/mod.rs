//! Shared test fixtures.
//!
//! [`ModuleBuilder`] serializes in-memory metadata tables and heaps so resolver tests can
//! run against crafted modules. [`factories`] creates the class, method and constant-pool
//! objects the compiler tests translate.


pub use builder::*;
