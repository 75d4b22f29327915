//! Cursor-based byte parser for signature blobs.
//!
//! [`Parser`] walks a byte slice with a position, decoding the ECMA-335 compressed integer
//! and token encodings used inside `#Blob` heap entries. All reads are bounds-checked and
//! report [`crate::Error::OutOfBounds`] when the blob is truncated.
//!
//! # Compressed encodings (ECMA-335 §II.23.2)
//!
//! | First byte    | Width | Value bits |
//! |---------------|-------|------------|
//! | `0xxxxxxx`    | 1     | 7          |
//! | `10xxxxxx`    | 2     | 14         |
//! | `110xxxxx`    | 4     | 29         |
//!
//! Compressed tokens use the low two bits of the decoded value as a `TypeDefOrRef` tag
//! and the remaining bits as the row.

use crate::{
    file::io::{read_le_at, CilIO},
    metadata::token::Token,
    Error::OutOfBounds,
    Result,
};

/// A generic binary data parser for reading signature blobs.
///
/// # Examples
///
/// ```rust,ignore
/// use jcil::file::parser::Parser;
///
/// let data = [0x03, 0x80, 0x80];
/// let mut parser = Parser::new(&data);
///
/// assert_eq!(parser.read_compressed_uint()?, 3);
/// assert_eq!(parser.read_compressed_uint()?, 0x80);
/// # Ok::<(), jcil::Error>(())
/// ```
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new `Parser` positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` while unread bytes remain.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move the position forward by one byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn advance(&mut self) -> Result<()> {
        self.advance_by(1)
    }

    /// Move the position forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if that would pass the end of the data.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(OutOfBounds),
        }
    }

    /// Current position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Look at the current byte without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data.get(self.position).copied().ok_or(OutOfBounds)
    }

    /// Read a little-endian primitive and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value is truncated.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Borrow the next `length` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(length)?;
        Ok(&self.data[start..self.position])
    }

    /// Read a compressed unsigned integer (ECMA-335 §II.23.2).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncation, or [`crate::Error::Malformed`]
    /// when the first byte is not a valid length prefix.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        // 1-byte encoding: 0xxxxxxx
        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        // 2-byte encoding: 10xxxxxx xxxxxxxx
        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            let value = ((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte);
            return Ok(value);
        }

        // 4-byte encoding: 11xxxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if (first_byte & 0xE0) == 0xC0 {
            let b1 = u32::from(self.read_le::<u8>()?);
            let b2 = u32::from(self.read_le::<u8>()?);
            let b3 = u32::from(self.read_le::<u8>()?);
            let value = ((u32::from(first_byte) & 0x1F) << 24) | (b1 << 16) | (b2 << 8) | b3;
            return Ok(value);
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Read a compressed signed integer, as used by array lower bounds.
    ///
    /// # Errors
    /// Propagates errors from [`Parser::read_compressed_uint`].
    pub fn read_compressed_int(&mut self) -> Result<i32> {
        let unsigned = self.read_compressed_uint()?;

        #[allow(clippy::cast_possible_wrap)]
        let signed = if (unsigned & 1) == 0 {
            (unsigned >> 1) as i32
        } else {
            -((unsigned >> 1) as i32 + 1)
        };

        Ok(signed)
    }

    /// Read a compressed `TypeDefOrRef` token.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] when the tag bits are not a known table.
    pub fn read_compressed_token(&mut self) -> Result<Token> {
        let compressed_token = self.read_compressed_uint()?;

        let table: u32 = match compressed_token & 0x3 {
            0x0 => 0x0200_0000, // TypeDef
            0x1 => 0x0100_0000, // TypeRef
            0x2 => 0x1B00_0000, // TypeSpec
            _ => {
                return Err(malformed_error!(
                    "Invalid compressed token - {}",
                    compressed_token
                ))
            }
        };

        let table_index = compressed_token >> 2;

        Ok(Token::new(table + table_index))
    }
}
