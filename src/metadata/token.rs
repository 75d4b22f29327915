//! Metadata tokens.
//!
//! A token is a 32-bit reference to a row: the high byte names the table, the low 24 bits
//! hold the 1-based row id. Tokens are how methods, parameters and generic parameters are
//! identified across the resolver, and how the generic-parameter and native-binding
//! tables are matched against their owners.

use std::fmt;

use crate::metadata::tables::TableId;

/// A metadata token (`table << 24 | row`).
///
/// # Examples
///
/// ```rust
/// use jcil::metadata::{tables::TableId, token::Token};
///
/// let token = Token::from_parts(TableId::MethodDef, 3);
/// assert_eq!(token.value(), 0x0600_0003);
/// assert!(token.is_table(TableId::MethodDef));
/// assert_eq!(token.row(), 3);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Create a token from its raw value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token pointing at `row` of `table`.
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// The raw 32-bit value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table byte.
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The 1-based row id, `0` for a nil token.
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns `true` if this token points into `table`.
    #[must_use]
    pub fn is_table(&self, table: TableId) -> bool {
        self.table() == table as u8
    }

    /// Returns `true` for a token without a row.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row() == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
