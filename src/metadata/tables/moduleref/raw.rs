use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A `ModuleRef` row (ECMA-335 §II.22.31).
#[derive(Clone, Debug)]
pub struct ModuleRefRaw {
    /// Row id (1-based)
    pub rid: u32,
    /// Metadata token
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// `#Strings` index of the module name
    pub name: u32,
}

impl RowReadable for ModuleRefRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* name */  sizes.str_bytes()
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ModuleRefRaw {
            rid,
            token: Token::from_parts(TableId::ModuleRef, rid),
            offset: *offset,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}
