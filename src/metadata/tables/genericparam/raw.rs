use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A `GenericParam` row (ECMA-335 §II.22.20).
#[derive(Clone, Debug)]
pub struct GenericParamRaw {
    /// Row id (1-based)
    pub rid: u32,
    /// Metadata token
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// 0-based ordinal within the owner
    pub number: u32,
    /// `GenericParamAttributes` bits (variance and special constraints)
    pub flags: u32,
    /// Owning `TypeDef` or `MethodDef`
    pub owner: CodedIndex,
    /// `#Strings` index of the name
    pub name: u32,
}

impl GenericParamRaw {
    /// The owner in its coded (sort key) form.
    ///
    /// The table is sorted by this value, not by the owner token.
    #[must_use]
    pub fn owner_key(&self) -> u32 {
        CodedIndexType::TypeOrMethodDef
            .encode(self.owner.tag, self.owner.row)
            .unwrap_or(0)
    }
}

impl RowReadable for GenericParamRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* number */    2 +
            /* flags */     2 +
            /* owner */     sizes.coded_index_bytes(CodedIndexType::TypeOrMethodDef) +
            /* name */      sizes.str_bytes()
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let offset_org = *offset;

        Ok(GenericParamRaw {
            rid,
            token: Token::from_parts(TableId::GenericParam, rid),
            offset: offset_org,
            number: u32::from(read_le_at::<u16>(data, offset)?),
            flags: u32::from(read_le_at::<u16>(data, offset)?),
            owner: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeOrMethodDef)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}
