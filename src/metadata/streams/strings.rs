//! The `#Strings` heap.
//!
//! Null-terminated UTF-8 identifiers addressed by byte offset. Offset `0` is always the
//! empty string, which is how tables encode "no name" (for instance a `Param` row for an
//! unnamed parameter).

use std::{ffi::CStr, str};

use crate::{Error::OutOfBounds, Result};

/// A read-only view of the `#Strings` heap.
///
/// # Examples
///
/// ```rust
/// use jcil::metadata::streams::Strings;
///
/// let data = [0x00, b'g', b'e', b't', 0x00];
/// let strings = Strings::from(&data)?;
/// assert_eq!(strings.get(1)?, "get");
/// assert_eq!(strings.get(0)?, "");
/// # Ok::<(), jcil::Error>(())
/// ```
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wrap the heap bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap is empty or does not start with the
    /// mandatory null byte.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.first() != Some(&0) {
            return Err(malformed_error!("Provided #Strings heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Get the string starting at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `index` is past the heap, and
    /// [`crate::Error::Malformed`] if the string is unterminated or not UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        CStr::from_bytes_until_nul(&self.data[index..])
            .ok()
            .and_then(|result| result.to_str().ok())
            .ok_or_else(|| malformed_error!("Invalid string at index - {}", index))
    }
}
