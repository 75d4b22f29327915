//! Row definitions for the metadata tables the resolver reads.
//!
//! Each table lives in its own module exposing a `*Raw` row type: the row exactly as stored,
//! with heap offsets and row indexes left unresolved. Resolution into higher-level entities
//! happens lazily in [`crate::metadata::method`].
//!
//! | Table | Row type | Used for |
//! |-------|----------|----------|
//! | `MethodDef` | [`MethodDefRaw`] | flags, name, signature, parameter run |
//! | `Param` | [`ParamRaw`] | parameter names, flags, sequence numbers |
//! | `Constant` | [`ConstantRaw`] | parameter default values |
//! | `CustomAttribute` | [`CustomAttributeRaw`] | declared attributes |
//! | `ModuleRef` | [`ModuleRefRaw`] | native import scope names |
//! | `ImplMap` | [`ImplMapRaw`] | native bindings |
//! | `GenericParam` | [`GenericParamRaw`] | method generic parameters |

mod constant;
mod customattribute;
mod genericparam;
mod implmap;
mod methoddef;
mod moduleref;
mod param;
mod types;

pub use constant::*;
pub use customattribute::*;
pub use genericparam::*;
pub use implmap::*;
pub use methoddef::*;
pub use moduleref::*;
pub use param::*;
pub use types::*;
