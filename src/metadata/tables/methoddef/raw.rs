use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A `MethodDef` row with unresolved heap and table indexes.
///
/// # Table Structure (ECMA-335 §II.22.26)
///
/// | Column | Type |
/// |--------|------|
/// | `RVA` | 4-byte body address |
/// | `ImplFlags` | 2-byte `MethodImplAttributes` |
/// | `Flags` | 2-byte `MethodAttributes` |
/// | `Name` | `#Strings` index |
/// | `Signature` | `#Blob` index |
/// | `ParamList` | `Param` table index |
#[derive(Clone, Debug)]
pub struct MethodDefRaw {
    /// Row id (1-based)
    pub rid: u32,
    /// Metadata token
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// Relative virtual address of the body, `0` for abstract and native methods
    pub rva: u32,
    /// `MethodImplAttributes` bits
    pub impl_flags: u32,
    /// `MethodAttributes` bits
    pub flags: u32,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Blob` index of the signature
    pub signature: u32,
    /// First `Param` row owned by this method
    pub param_list: u32,
}

impl RowReadable for MethodDefRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* rva */           4 +
            /* impl_flags */    2 +
            /* flags */         2 +
            /* name */          sizes.str_bytes() +
            /* signature */     sizes.blob_bytes() +
            /* param_list */    sizes.table_index_bytes(TableId::Param)
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let offset_org = *offset;

        Ok(MethodDefRaw {
            rid,
            token: Token::from_parts(TableId::MethodDef, rid),
            offset: offset_org,
            rva: read_le_at::<u32>(data, offset)?,
            impl_flags: u32::from(read_le_at::<u16>(data, offset)?),
            flags: u32::from(read_le_at::<u16>(data, offset)?),
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            param_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Param))?,
        })
    }
}
