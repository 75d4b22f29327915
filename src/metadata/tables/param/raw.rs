use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A `Param` row (ECMA-335 §II.22.33).
#[derive(Clone, Debug)]
pub struct ParamRaw {
    /// Row id (1-based)
    pub rid: u32,
    /// Metadata token
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// `ParamAttributes` bits
    pub flags: u32,
    /// `0` for the return value, otherwise the 1-based parameter number
    pub sequence: u32,
    /// `#Strings` index of the name, `0` when unnamed
    pub name: u32,
}

impl RowReadable for ParamRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* flags */     2 +
            /* sequence */  2 +
            /* name */      sizes.str_bytes()
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ParamRaw {
            rid,
            token: Token::from_parts(TableId::Param, rid),
            offset: *offset,
            flags: u32::from(read_le_at::<u16>(data, offset)?),
            sequence: u32::from(read_le_at::<u16>(data, offset)?),
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}
