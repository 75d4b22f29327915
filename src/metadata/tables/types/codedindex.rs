//! Coded indexes (ECMA-335 §II.24.2.6).
//!
//! A coded index packs a small table tag into the low bits of a row reference so one column
//! can point into several tables. The width of the column (2 or 4 bytes) depends on the row
//! counts of every candidate table, which [`crate::metadata::tables::TableInfo`] precomputes.

use strum::{EnumCount, EnumIter};

use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// The coded-index column kinds read by this crate.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    /// `TypeDef`, `TypeRef`, `TypeSpec`
    TypeDefOrRef,
    /// `Field`, `Param`, `Property` - owner of a `Constant` row
    HasConstant,
    /// Any attributable row - parent of a `CustomAttribute` row
    HasCustomAttribute,
    /// `Field`, `MethodDef` - the member an `ImplMap` row forwards
    MemberForwarded,
    /// Constructor of a custom attribute
    CustomAttributeType,
    /// `TypeDef`, `MethodDef` - owner of a `GenericParam` row
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// The candidate tables, indexed by tag.
    ///
    /// `CustomAttributeType` reserves tags 0, 1 and 4; those slots are filled with the
    /// neighbouring table and rejected by [`CodedIndexType::table_for_tag`].
    #[must_use]
    pub fn tables(&self) -> &'static [TableId] {
        match self {
            CodedIndexType::TypeDefOrRef => {
                &[TableId::TypeDef, TableId::TypeRef, TableId::TypeSpec]
            }
            CodedIndexType::HasConstant => &[TableId::Field, TableId::Param, TableId::Property],
            CodedIndexType::HasCustomAttribute => &[
                TableId::MethodDef,
                TableId::Field,
                TableId::TypeRef,
                TableId::TypeDef,
                TableId::Param,
                TableId::InterfaceImpl,
                TableId::MemberRef,
                TableId::Module,
                TableId::DeclSecurity,
                TableId::Property,
                TableId::Event,
                TableId::StandAloneSig,
                TableId::ModuleRef,
                TableId::TypeSpec,
                TableId::Assembly,
                TableId::AssemblyRef,
                TableId::File,
                TableId::ExportedType,
                TableId::ManifestResource,
                TableId::GenericParam,
                TableId::GenericParamConstraint,
                TableId::MethodSpec,
            ],
            CodedIndexType::MemberForwarded => &[TableId::Field, TableId::MethodDef],
            CodedIndexType::CustomAttributeType => &[
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MemberRef,
                TableId::MemberRef,
            ],
            CodedIndexType::TypeOrMethodDef => &[TableId::TypeDef, TableId::MethodDef],
        }
    }

    /// Number of low bits used for the tag.
    #[must_use]
    pub fn tag_bits(&self) -> u8 {
        let candidates = self.tables().len();
        #[allow(clippy::cast_possible_truncation)]
        let bits = (usize::BITS - (candidates - 1).leading_zeros()) as u8;
        bits
    }

    /// Resolve a tag to its table, `None` for tags outside the set or reserved.
    #[must_use]
    pub fn table_for_tag(&self, tag: u32) -> Option<TableId> {
        if *self == CodedIndexType::CustomAttributeType && !matches!(tag, 2 | 3) {
            return None;
        }
        self.tables().get(tag as usize).copied()
    }

    /// Encode a row reference into its coded form.
    ///
    /// Returns `None` if `table` is not a candidate of this coded index.
    #[must_use]
    pub fn encode(&self, table: TableId, row: u32) -> Option<u32> {
        let tag = (0..self.tables().len())
            .find(|&tag| self.table_for_tag(tag as u32) == Some(table))?;
        #[allow(clippy::cast_possible_truncation)]
        Some((row << self.tag_bits()) | tag as u32)
    }
}

/// A decoded coded index.
#[derive(Clone, Debug, PartialEq)]
pub struct CodedIndex {
    /// The table the tag selected
    pub tag: TableId,
    /// The 1-based row within `tag`, `0` for a nil reference
    pub row: u32,
    /// Token equivalent of `tag` and `row`
    pub token: Token,
}

impl CodedIndex {
    /// Read and decode a coded index column.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated data and [`crate::Error::Malformed`]
    /// on an unknown tag.
    pub fn read(
        data: &[u8],
        offset: &mut usize,
        info: &TableInfoRef,
        ci_type: CodedIndexType,
    ) -> Result<Self> {
        let coded_index = read_le_at_dyn(data, offset, info.coded_index_bytes(ci_type) == 4)?;

        let (tag, row) = info.decode_coded_index(coded_index, ci_type)?;
        Ok(CodedIndex::new(tag, row))
    }

    /// Create a coded index from a table and row.
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> CodedIndex {
        CodedIndex {
            tag,
            row,
            token: Token::from_parts(tag, row),
        }
    }
}
