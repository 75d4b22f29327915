use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every error produced by this crate is fatal for the translation pass that raised it. A
/// declined intrinsic substitution is not an error; it is reported as
/// [`crate::compiler::Substitution::Declined`].
///
/// # Error Categories
///
/// ## Corruption Errors
/// - [`Error::Malformed`] - Table or blob data violates the format contract
/// - [`Error::OutOfBounds`] - A heap, table or blob read went past its end
/// - [`Error::RecursionLimit`] - A signature nests deeper than allowed
///
/// ## Configuration Errors
/// - [`Error::Configuration`] - The translation environment is missing a required marker
/// - [`Error::TypeNotFound`] - A core-library class needed by a rule is not configured
///
/// # Examples
///
/// ```rust
/// use jcil::Error;
///
/// fn report(err: &Error) -> &'static str {
///     match err {
///         Error::Malformed { .. } | Error::OutOfBounds => "corrupt metadata",
///         Error::Configuration(_) | Error::TypeNotFound(_) => "bad translator setup",
///         _ => "other",
///     }
/// }
/// # let _ = report(&Error::OutOfBounds);
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The metadata is damaged and could not be decoded.
    ///
    /// Raised when table rows reference out-of-range rows, parameter ranges are not
    /// monotonic, or a blob does not follow the expected encoding. The loader is trusted
    /// to have validated the structure, so reaching this state is a contract violation.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while reading a heap, table or blob.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Recursion limit reached while decoding a nested signature.
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// The translation environment does not satisfy a rule's hard requirement.
    ///
    /// Emitting a call with a missing implicit argument would produce an invalid method
    /// body, so the rule fails loudly with this diagnostic instead.
    #[error("Configuration error - {0}")]
    Configuration(String),

    /// A class required by an intrinsic rule is not part of the configured core library.
    #[error("Failed to find core class - {0}")]
    TypeNotFound(String),
}
