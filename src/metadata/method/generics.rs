//! Generic parameters of methods, found by owner in the sorted `GenericParam` table.

use crate::{
    metadata::{
        method::MethodDef,
        tables::{CodedIndexType, TableId},
        token::Token,
    },
    Result,
};

/// A generic parameter declared by a method.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericParameter {
    /// Token of the owning method
    pub owner: Token,
    /// 0-based ordinal
    pub number: u32,
    /// `GenericParamAttributes` bits
    pub flags: u32,
    /// Declared name
    pub name: String,
    /// `GenericParam` row id
    pub rid: u32,
}

/// Find the contiguous `GenericParam` rows owned by `method`.
///
/// The table is sorted by the owner's `TypeOrMethodDef` coded value. A method without rows is not generic.
pub(crate) fn resolve(method: &MethodDef) -> Result<Vec<GenericParameter>> {
    let module = method.module();
    let Some(table) = module.generic_params() else {
        return Ok(Vec::new());
    };
    module.stats().record_generic_param_search();

    let Some(key) = CodedIndexType::TypeOrMethodDef.encode(TableId::MethodDef, method.rid())
    else {
        return Err(malformed_error!("MethodDef is not a TypeOrMethodDef target"));
    };

    let mut generics = Vec::new();
    for row in table.equal_range(|row| row.owner_key(), key)? {
        generics.push(GenericParameter {
            owner: method.token(),
            number: row.number,
            flags: row.flags,
            name: module.strings().get(row.name as usize)?.to_string(),
            rid: row.rid,
        });
    }

    Ok(generics)
}
