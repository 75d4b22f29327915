//! Low-level, bounds-checked little-endian reads for metadata rows and blobs.
//!
//! ECMA-335 metadata is stored little-endian throughout. Every read in this crate that
//! touches raw table or heap bytes goes through [`read_le_at`] or [`read_le_at_dyn`], so
//! truncated input surfaces as [`crate::Error::OutOfBounds`] instead of a panic.
//!
//! # Key Components
//!
//! - [`CilIO`] - Trait implemented by the primitive types that can be decoded
//! - [`read_le`] - Read a value from the start of a buffer
//! - [`read_le_at`] - Read a value at an offset, advancing the offset
//! - [`read_le_at_dyn`] - Read a 2- or 4-byte heap/table index
//!
//! # Examples
//!
//! ```rust,ignore
//! use jcil::file::io::read_le_at;
//!
//! let data = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
//! let mut offset = 0;
//!
//! let first: u16 = read_le_at(&data, &mut offset)?;  // offset: 0 -> 2
//! let second: u16 = read_le_at(&data, &mut offset)?; // offset: 2 -> 4
//! let third: u32 = read_le_at(&data, &mut offset)?;  // offset: 4 -> 8
//! # Ok::<(), jcil::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Trait for primitive types that can be decoded from little-endian byte sequences.
///
/// # Thread Safety
///
/// All implementations are pure conversions without shared state.
pub trait CilIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_cil_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_cil_io!(
    u64 => 8,
    i64 => 8,
    u32 => 4,
    i32 => 4,
    u16 => 2,
    i16 => 2,
    u8 => 1,
    i8 => 1,
    f32 => 4,
    f64 => 8,
);

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is shorter than `size_of::<T>()`.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing
/// the offset past the value on success.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would exceed the buffer.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Reads a heap or table index that is either 2 or 4 bytes wide, widened to `u32`.
///
/// ## Arguments
/// * `data` - The buffer to read from
/// * `offset` - The read position, advanced past the index
/// * `is_large` - `true` for a 4-byte index, `false` for a 2-byte index
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would exceed the buffer.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    let res = if is_large {
        read_le_at::<u32>(data, offset)?
    } else {
        u32::from(read_le_at::<u16>(data, offset)?)
    };

    Ok(res)
}
