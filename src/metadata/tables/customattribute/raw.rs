use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A `CustomAttribute` row (ECMA-335 §II.22.10).
#[derive(Clone, Debug)]
pub struct CustomAttributeRaw {
    /// Row id (1-based)
    pub rid: u32,
    /// Metadata token
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// The attributed row
    pub parent: CodedIndex,
    /// Attribute constructor (`MethodDef` or `MemberRef`)
    pub constructor: CodedIndex,
    /// `#Blob` index of the encoded arguments
    pub value: u32,
}

impl CustomAttributeRaw {
    /// The parent in its coded (sort key) form.
    #[must_use]
    pub fn parent_key(&self) -> u32 {
        CodedIndexType::HasCustomAttribute
            .encode(self.parent.tag, self.parent.row)
            .unwrap_or(0)
    }
}

impl RowReadable for CustomAttributeRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* parent */        sizes.coded_index_bytes(CodedIndexType::HasCustomAttribute) +
            /* constructor */   sizes.coded_index_bytes(CodedIndexType::CustomAttributeType) +
            /* value */         sizes.blob_bytes()
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let offset_org = *offset;

        Ok(CustomAttributeRaw {
            rid,
            token: Token::from_parts(TableId::CustomAttribute, rid),
            offset: offset_org,
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasCustomAttribute)?,
            constructor: CodedIndex::read(
                data,
                offset,
                sizes,
                CodedIndexType::CustomAttributeType,
            )?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::{MetadataTable, TableInfo};

    use super::*;

    #[test]
    fn crafted_short() {
        let data = vec![
            0x20, 0x00, // parent (MethodDef 1)
            0x0B, 0x00, // constructor (MemberRef 1)
            0x05, 0x00, // value
        ];

        let sizes = Arc::new(TableInfo::from_row_counts(
            &[
                (TableId::CustomAttribute, 1),
                (TableId::MethodDef, 1),
                (TableId::MemberRef, 1),
            ],
            false,
            false,
            false,
        ));
        let table = MetadataTable::<CustomAttributeRaw>::new(&data, 1, sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.token.value(), 0x0C00_0001);
        assert_eq!(row.parent.tag, TableId::MethodDef);
        assert_eq!(row.parent.row, 1);
        assert_eq!(row.parent_key(), 0x20);
        assert_eq!(row.constructor.tag, TableId::MemberRef);
        assert_eq!(row.constructor.token.value(), 0x0A00_0001);
        assert_eq!(row.value, 5);
    }

    #[test]
    fn reserved_constructor_tag() {
        let data = vec![
            0x20, 0x00, // parent (MethodDef 1)
            0x08, 0x00, // constructor, reserved tag 0
            0x05, 0x00, // value
        ];

        let sizes = Arc::new(TableInfo::from_row_counts(
            &[(TableId::CustomAttribute, 1), (TableId::MethodDef, 1)],
            false,
            false,
            false,
        ));
        let table = MetadataTable::<CustomAttributeRaw>::new(&data, 1, sizes).unwrap();
        assert!(table.get(1).is_none());
    }
}
