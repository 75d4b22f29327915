//! The `#Blob` heap.
//!
//! Each entry is a compressed length prefix followed by that many bytes. Method signatures,
//! constant values and custom-attribute values all live here. Offset `0` is the empty blob.

use crate::{file::parser::Parser, Error::OutOfBounds, Result};

/// A read-only view of the `#Blob` heap.
///
/// # Examples
///
/// ```rust
/// use jcil::metadata::streams::Blob;
///
/// // A default instance method signature `void ()`
/// let data = [0x00, 0x03, 0x20, 0x00, 0x01];
/// let blob = Blob::from(&data)?;
/// assert_eq!(blob.get(1)?, &[0x20, 0x00, 0x01]);
/// # Ok::<(), jcil::Error>(())
/// ```
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Wrap the heap bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap is empty or does not start with the
    /// mandatory zero-length entry.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.first() != Some(&0) {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(Blob { data })
    }

    /// Get the blob entry at `index`, without its length prefix.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the entry or its prefix exceed the heap.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;

        let Some(data_start) = index.checked_add(parser.pos()) else {
            return Err(OutOfBounds);
        };
        let Some(data_end) = data_start.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if data_end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[data_start..data_end])
    }
}
