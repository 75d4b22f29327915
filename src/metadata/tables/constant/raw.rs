use crate::{
    file::{
        io::{read_le, read_le_at, read_le_at_dyn},
        parser::Parser,
    },
    metadata::{
        signatures::ELEMENT_TYPE,
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A decoded default value.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    /// `bool`
    Boolean(bool),
    /// UTF-16 code unit
    Char(u16),
    /// `int8`
    I1(i8),
    /// `uint8`
    U1(u8),
    /// `int16`
    I2(i16),
    /// `uint16`
    U2(u16),
    /// `int32`
    I4(i32),
    /// `uint32`
    U4(u32),
    /// `int64`
    I8(i64),
    /// `uint64`
    U8(u64),
    /// `float32`
    R4(f32),
    /// `float64`
    R8(f64),
    /// A string literal
    String(String),
    /// The null reference
    Null,
}

/// A `Constant` row (ECMA-335 §II.22.9).
#[derive(Clone, Debug)]
pub struct ConstantRaw {
    /// Row id (1-based)
    pub rid: u32,
    /// Metadata token
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// `ELEMENT_TYPE` of the value
    pub base: u8,
    /// Owning `Field`, `Param` or `Property`
    pub parent: CodedIndex,
    /// `#Blob` index of the value bytes
    pub value: u32,
}

impl ConstantRaw {
    /// The parent in its coded (sort key) form.
    #[must_use]
    pub fn parent_key(&self) -> u32 {
        CodedIndexType::HasConstant
            .encode(self.parent.tag, self.parent.row)
            .unwrap_or(0)
    }

    /// Decode the value blob according to [`ConstantRaw::base`].
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob is shorter than the type requires,
    /// or [`crate::Error::Malformed`] for an unsupported element type.
    pub fn decode(&self, data: &[u8]) -> Result<ConstantValue> {
        Ok(match self.base {
            ELEMENT_TYPE::BOOLEAN => ConstantValue::Boolean(read_le::<u8>(data)? != 0),
            ELEMENT_TYPE::CHAR => ConstantValue::Char(read_le::<u16>(data)?),
            ELEMENT_TYPE::I1 => ConstantValue::I1(read_le::<i8>(data)?),
            ELEMENT_TYPE::U1 => ConstantValue::U1(read_le::<u8>(data)?),
            ELEMENT_TYPE::I2 => ConstantValue::I2(read_le::<i16>(data)?),
            ELEMENT_TYPE::U2 => ConstantValue::U2(read_le::<u16>(data)?),
            ELEMENT_TYPE::I4 => ConstantValue::I4(read_le::<i32>(data)?),
            ELEMENT_TYPE::U4 => ConstantValue::U4(read_le::<u32>(data)?),
            ELEMENT_TYPE::I8 => ConstantValue::I8(read_le::<i64>(data)?),
            ELEMENT_TYPE::U8 => ConstantValue::U8(read_le::<u64>(data)?),
            ELEMENT_TYPE::R4 => ConstantValue::R4(read_le::<f32>(data)?),
            ELEMENT_TYPE::R8 => ConstantValue::R8(read_le::<f64>(data)?),
            ELEMENT_TYPE::STRING => {
                let mut parser = Parser::new(data);
                let mut units = Vec::with_capacity(data.len() / 2);
                while parser.remaining() >= 2 {
                    units.push(parser.read_le::<u16>()?);
                }
                ConstantValue::String(String::from_utf16_lossy(&units))
            }
            ELEMENT_TYPE::CLASS => ConstantValue::Null,
            other => {
                return Err(malformed_error!(
                    "Unsupported constant type 0x{:02x} in row {}",
                    other,
                    self.rid
                ))
            }
        })
    }
}

impl RowReadable for ConstantRaw {
    #[rustfmt::skip]
    fn row_size(sizes: &TableInfoRef) -> u32 {
        u32::from(
            /* base */      1 +
            /* padding */   1 +
            /* parent */    sizes.coded_index_bytes(CodedIndexType::HasConstant) +
            /* value */     sizes.blob_bytes()
        )
    }

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let offset_org = *offset;

        let base = read_le_at::<u8>(data, offset)?;
        let _padding = read_le_at::<u8>(data, offset)?;

        Ok(ConstantRaw {
            rid,
            token: Token::from_parts(TableId::Constant, rid),
            offset: offset_org,
            base,
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasConstant)?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}
