//! Generic, typed access to column-oriented metadata tables.
//!
//! A table is a contiguous run of fixed-size rows. [`MetadataTable`] wraps the raw bytes and
//! decodes a row only when it is asked for, so nothing is materialized up front. Rows are
//! addressed 1-based, as in metadata tokens; row `0` is the nil reference.
//!
//! # Key Components
//!
//! - [`RowReadable`] - implemented by every raw row type
//! - [`MetadataTable`] - typed table view with `get`, sequential and parallel iteration,
//!   and a lower-bound search for sorted tables
//! - [`TableInfo`] / [`CodedIndex`] - column width computation and coded index decoding

mod codedindex;
mod tableid;
mod tableinfo;

use crate::{Error::OutOfBounds, Result};
use rayon::iter::{plumbing, IndexedParallelIterator, ParallelIterator};
use std::marker::PhantomData;

pub use codedindex::{CodedIndex, CodedIndexType};
pub use tableid::TableId;
pub use tableinfo::{TableInfo, TableInfoRef, TableRowInfo};

/// Trait for reading one row of a metadata table.
///
/// Implementations must be `Send` so tables can be scanned with rayon, and must consume
/// exactly [`RowReadable::row_size`] bytes per row.
pub trait RowReadable: Sized + Send {
    /// Size in bytes of a single row, given the module's index widths.
    fn row_size(sizes: &TableInfoRef) -> u32;

    /// Read the row at `offset`, advancing the offset past it.
    ///
    /// ## Arguments
    ///
    /// * `data` - The table bytes
    /// * `offset` - Read position, advanced by the row size
    /// * `rid` - The 1-based row id of this row
    /// * `sizes` - Index widths for variable-sized columns
    ///
    /// # Errors
    /// Returns an error if the row is truncated or a coded index carries an invalid tag.
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self>;
}

/// A typed view of one metadata table.
///
/// ## Examples
///
/// ```rust,ignore
/// use jcil::metadata::tables::{MetadataTable, ParamRaw};
///
/// let table: MetadataTable<ParamRaw> = MetadataTable::new(data, rows, sizes)?;
/// if let Some(first) = table.get(1) {
///     println!("sequence {}", first.sequence);
/// }
///
/// // GenericParam rows are sorted by owner
/// let first_owned = table.lower_bound(|row| row.sequence < 2)?;
/// # Ok::<(), jcil::Error>(())
/// ```
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    row_size: u32,
    sizes: TableInfoRef,
    _phantom: PhantomData<fn() -> T>,
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Wrap the table bytes.
    ///
    /// ## Arguments
    ///
    /// * `data` - The raw table bytes
    /// * `row_count` - Number of rows in the table
    /// * `sizes` - Index widths of the owning module
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `row_count` rows.
    pub fn new(data: &'a [u8], row_count: u32, sizes: TableInfoRef) -> Result<Self> {
        let row_size = T::row_size(&sizes);
        if (data.len() as u64) < u64::from(row_count) * u64::from(row_size) {
            return Err(OutOfBounds);
        }

        Ok(MetadataTable {
            data,
            row_count,
            row_size,
            sizes,
            _phantom: PhantomData,
        })
    }

    /// Total size of this table in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::from(self.row_count) * u64::from(self.row_size)
    }

    /// Size of a single row in bytes.
    #[must_use]
    pub fn row_size(&self) -> u32 {
        self.row_size
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Get the row with the 1-based id `index`.
    ///
    /// Returns `None` for row `0`, for ids past the end, and for rows that fail to decode.
    #[must_use]
    pub fn get(&self, index: u32) -> Option<T> {
        if index == 0 || self.row_count < index {
            return None;
        }

        T::row_read(
            self.data,
            &mut ((index as usize - 1) * self.row_size as usize),
            index,
            &self.sizes,
        )
        .ok()
    }

    /// Find the first row for which `is_before` returns `false`.
    ///
    /// The table must be partitioned by the predicate (all `true` rows first), as sorted
    /// tables like `GenericParam` are for an owner comparison. Returns `row_count + 1`
    /// when every row satisfies the predicate.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a probed row fails to decode.
    pub fn lower_bound<F>(&self, is_before: F) -> Result<u32>
    where
        F: Fn(&T) -> bool,
    {
        let mut low = 1_u32;
        let mut high = self.row_count + 1;

        while low < high {
            let mid = low + (high - low) / 2;
            let Some(row) = self.get(mid) else {
                return Err(malformed_error!("Failed to read row {} during search", mid));
            };

            if is_before(&row) {
                low = mid + 1;
            } else {
                high = mid;
            }
        }

        Ok(low)
    }

    /// Collect the contiguous rows whose sort key equals `key`.
    ///
    /// The table must be sorted by `key_of`, as `GenericParam`, `Constant` and
    /// `CustomAttribute` are sorted by their owner column.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a probed row fails to decode.
    pub fn equal_range<F>(&self, key_of: F, key: u32) -> Result<Vec<T>>
    where
        F: Fn(&T) -> u32,
    {
        let mut rows = Vec::new();
        let mut row_id = self.lower_bound(|row| key_of(row) < key)?;
        while let Some(row) = self.get(row_id) {
            if key_of(&row) != key {
                break;
            }
            rows.push(row);
            row_id += 1;
        }

        Ok(rows)
    }

    /// Sequential iterator over all rows.
    #[must_use]
    pub fn iter(&'a self) -> TableIterator<'a, T> {
        TableIterator {
            table: self,
            current_row: 0,
            current_offset: 0,
        }
    }

    /// Rayon parallel iterator over all rows.
    #[must_use]
    pub fn par_iter(&'a self) -> TableParIterator<'a, T> {
        TableParIterator {
            table: self,
            range: 0..self.row_count,
        }
    }
}

impl<'a, T: RowReadable> IntoIterator for &'a MetadataTable<'a, T> {
    type Item = T;
    type IntoIter = TableIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Sequential iterator for metadata table rows.
///
/// Decoding stops at the first row that fails to read.
pub struct TableIterator<'a, T> {
    table: &'a MetadataTable<'a, T>,
    current_row: u32,
    current_offset: usize,
}

impl<T: RowReadable> Iterator for TableIterator<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.table.row_count {
            return None;
        }

        match T::row_read(
            self.table.data,
            &mut self.current_offset,
            self.current_row + 1,
            &self.table.sizes,
        ) {
            Ok(row) => {
                self.current_row += 1;
                Some(row)
            }
            Err(_) => None,
        }
    }
}

/// Parallel iterator for metadata table rows.
///
/// Created through [`MetadataTable::par_iter`]; supports every rayon adaptor, including
/// `try_for_each` for early termination on errors.
pub struct TableParIterator<'a, T> {
    table: &'a MetadataTable<'a, T>,
    range: std::ops::Range<u32>,
}

impl<T: RowReadable + Send + Sync> ParallelIterator for TableParIterator<'_, T> {
    type Item = T;

    fn drive_unindexed<C>(self, consumer: C) -> C::Result
    where
        C: plumbing::UnindexedConsumer<Self::Item>,
    {
        plumbing::bridge(self, consumer)
    }

    fn opt_len(&self) -> Option<usize> {
        Some(self.range.len())
    }
}

impl<T: RowReadable + Send + Sync> IndexedParallelIterator for TableParIterator<'_, T> {
    fn len(&self) -> usize {
        self.range.len()
    }

    fn drive<C>(self, consumer: C) -> C::Result
    where
        C: plumbing::Consumer<Self::Item>,
    {
        plumbing::bridge(self, consumer)
    }

    fn with_producer<CB>(self, callback: CB) -> CB::Output
    where
        CB: plumbing::ProducerCallback<Self::Item>,
    {
        callback.callback(TableProducer {
            table: self.table,
            range: self.range,
        })
    }
}

struct TableProducer<'a, T> {
    table: &'a MetadataTable<'a, T>,
    range: std::ops::Range<u32>,
}

impl<'a, T: RowReadable + Send + Sync> plumbing::Producer for TableProducer<'a, T> {
    type Item = T;
    type IntoIter = TableProducerIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        TableProducerIterator {
            table: self.table,
            range: self.range,
        }
    }

    fn split_at(self, index: usize) -> (Self, Self) {
        #[allow(clippy::cast_possible_truncation)]
        let mid = self.range.start + index as u32;
        let left = TableProducer {
            table: self.table,
            range: self.range.start..mid,
        };
        let right = TableProducer {
            table: self.table,
            range: mid..self.range.end,
        };
        (left, right)
    }
}

// Rows were bounds-checked in `MetadataTable::new`, so `get` only fails on a bad coded
// index tag, which ends this chunk early.
struct TableProducerIterator<'a, T> {
    table: &'a MetadataTable<'a, T>,
    range: std::ops::Range<u32>,
}

impl<T: RowReadable + Send + Sync> Iterator for TableProducerIterator<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.range.start >= self.range.end {
            return None;
        }

        let row_index = self.range.start;
        self.range.start += 1;

        self.table.get(row_index + 1)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.range.len();
        (len, Some(len))
    }
}

impl<T: RowReadable + Send + Sync> ExactSizeIterator for TableProducerIterator<'_, T> {}

impl<T: RowReadable + Send + Sync> DoubleEndedIterator for TableProducerIterator<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.range.start >= self.range.end {
            return None;
        }

        self.range.end -= 1;

        self.table.get(self.range.end + 1)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rayon::iter::ParallelIterator;

    use super::*;
    use crate::file::io::read_le_at;

    struct Word {
        rid: u32,
        value: u16,
    }

    impl RowReadable for Word {
        fn row_size(_sizes: &TableInfoRef) -> u32 {
            2
        }

        fn row_read(data: &[u8], offset: &mut usize, rid: u32, _sizes: &TableInfoRef) -> Result<Self> {
            Ok(Word {
                rid,
                value: read_le_at::<u16>(data, offset)?,
            })
        }
    }

    fn sizes() -> TableInfoRef {
        Arc::new(TableInfo::from_row_counts(&[], false, false, false))
    }

    const SORTED: [u8; 10] = [1, 0, 3, 0, 3, 0, 3, 0, 9, 0];

    #[test]
    fn get_is_one_based() {
        let table = MetadataTable::<Word>::new(&SORTED, 5, sizes()).unwrap();

        assert!(table.get(0).is_none());
        assert_eq!(table.get(1).unwrap().value, 1);
        assert_eq!(table.get(5).unwrap().value, 9);
        assert!(table.get(6).is_none());
        assert_eq!(table.size(), 10);
    }

    #[test]
    fn short_data_is_rejected() {
        assert!(matches!(
            MetadataTable::<Word>::new(&SORTED, 6, sizes()),
            Err(OutOfBounds)
        ));
    }

    #[test]
    fn lower_bound() {
        let table = MetadataTable::<Word>::new(&SORTED, 5, sizes()).unwrap();

        assert_eq!(table.lower_bound(|row| row.value < 3).unwrap(), 2);
        assert_eq!(table.lower_bound(|row| row.value < 1).unwrap(), 1);
        assert_eq!(table.lower_bound(|row| row.value < 4).unwrap(), 5);
        assert_eq!(table.lower_bound(|row| row.value < 10).unwrap(), 6);

        let empty = MetadataTable::<Word>::new(&[], 0, sizes()).unwrap();
        assert_eq!(empty.lower_bound(|_| true).unwrap(), 1);
    }

    #[test]
    fn equal_range() {
        let table = MetadataTable::<Word>::new(&SORTED, 5, sizes()).unwrap();

        let rids: Vec<u32> = table
            .equal_range(|row| u32::from(row.value), 3)
            .unwrap()
            .iter()
            .map(|row| row.rid)
            .collect();
        assert_eq!(rids, vec![2, 3, 4]);

        assert!(table.equal_range(|row| u32::from(row.value), 5).unwrap().is_empty());
        assert!(table.equal_range(|row| u32::from(row.value), 10).unwrap().is_empty());
    }

    #[test]
    fn iterators() {
        let table = MetadataTable::<Word>::new(&SORTED, 5, sizes()).unwrap();

        let rids: Vec<u32> = table.iter().map(|row| row.rid).collect();
        assert_eq!(rids, vec![1, 2, 3, 4, 5]);

        let sum: u32 = table.par_iter().map(|row| u32::from(row.value)).sum();
        assert_eq!(sum, 19);

        let result = table.par_iter().try_for_each(|row| {
            if row.value == 9 {
                Err(OutOfBounds)
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
    }
}
