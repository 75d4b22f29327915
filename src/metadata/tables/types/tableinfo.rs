//! Row counts and index widths for a module's metadata tables.
//!
//! Column widths in ECMA-335 tables are not fixed: a heap index is 4 bytes only when the
//! heap is large, a simple table index is 4 bytes only when the target table has more than
//! `u16::MAX` rows, and a coded index grows once its largest candidate table no longer fits
//! beside the tag bits. [`TableInfo`] answers those questions for every row reader.

use std::sync::Arc;
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    metadata::tables::types::{CodedIndexType, TableId},
    Result,
};

/// Row count and index width of one table.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Bits needed to address every row
    pub bits: u8,
    /// `true` when a simple index into this table is 4 bytes wide
    pub is_large: bool,
}

impl TableRowInfo {
    /// Compute the addressing information for `rows` rows.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self {
            rows,
            bits,
            is_large: rows > u32::from(u16::MAX),
        }
    }
}

/// Sizing information shared by all tables of one module.
///
/// The module loader knows the row counts from the `#~` stream header and the heap-size
/// flags; this crate only consumes them.
///
/// # Examples
///
/// ```rust
/// use jcil::metadata::tables::{CodedIndexType, TableId, TableInfo};
///
/// let info = TableInfo::from_row_counts(&[(TableId::MethodDef, 70_000)], false, false, false);
/// assert!(info.is_large(TableId::MethodDef));
/// assert_eq!(info.table_index_bytes(TableId::MethodDef), 4);
/// assert_eq!(info.coded_index_bytes(CodedIndexType::TypeOrMethodDef), 4);
/// assert_eq!(info.str_bytes(), 2);
/// ```
#[derive(Clone, Default)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

/// Shared reference to a [`TableInfo`].
pub type TableInfoRef = Arc<TableInfo>;

impl TableInfo {
    /// Build the sizing information from the loader's row counts and heap-size flags.
    ///
    /// Tables not listed have zero rows.
    #[must_use]
    pub fn from_row_counts(
        row_counts: &[(TableId, u32)],
        large_str: bool,
        large_blob: bool,
        large_guid: bool,
    ) -> Self {
        let mut table_info = TableInfo {
            rows: vec![TableRowInfo::default(); TableId::GenericParamConstraint as usize + 1],
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: large_str,
            is_large_index_guid: large_guid,
            is_large_index_blob: large_blob,
        };

        for &(table, rows) in row_counts {
            table_info.rows[table as usize] = TableRowInfo::new(rows);
        }

        table_info.calculate_coded_index_bits();
        table_info
    }

    /// Split a coded index value into its table and row.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the tag does not name a candidate table.
    pub fn decode_coded_index(
        &self,
        value: u32,
        coded_index_type: CodedIndexType,
    ) -> Result<(TableId, u32)> {
        let tag_bits = coded_index_type.tag_bits();
        let tag = value & ((1 << tag_bits) - 1);

        match coded_index_type.table_for_tag(tag) {
            Some(table) => Ok((table, value >> tag_bits)),
            None => Err(malformed_error!(
                "Invalid tag {} for coded index {:?}",
                tag,
                coded_index_type
            )),
        }
    }

    /// `true` when simple indexes into `id` are 4 bytes wide.
    #[must_use]
    pub fn is_large(&self, id: TableId) -> bool {
        self.rows[id as usize].is_large
    }

    /// `true` when `#Strings` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// `true` when `#GUID` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// `true` when `#Blob` indexes are 4 bytes wide.
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Width of a `#Strings` index in bytes.
    #[must_use]
    pub fn str_bytes(&self) -> u8 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` index in bytes.
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// Row information for `table`.
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table as usize]
    }

    /// Width of a simple index into `table_id` in bytes.
    #[must_use]
    pub fn table_index_bytes(&self, table_id: TableId) -> u8 {
        if self.rows[table_id as usize].bits > 16 {
            4
        } else {
            2
        }
    }

    /// Width of a coded index column in bytes.
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u8 {
        if self.coded_indexes[coded_index_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    fn calculate_coded_index_bits(&mut self) {
        for coded_index in CodedIndexType::iter() {
            let max_bits = coded_index
                .tables()
                .iter()
                .map(|table| self.rows[*table as usize].bits)
                .max()
                .unwrap_or(1);

            self.coded_indexes[coded_index as usize] = max_bits + coded_index.tag_bits();
        }
    }
}
