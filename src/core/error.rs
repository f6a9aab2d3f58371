/// SQLGate Error Module
///
/// This module defines the error types used throughout the access layer.
/// Primary operation failures are always classified and raised; the two
/// deliberately swallowed-and-logged paths (auto-commit restore after a
/// successful commit, rollback issued in response to another failure) never
/// produce these values — they go to the diagnostic log instead.
use thiserror::Error;

/// A native error reported by a vendor driver, before classification.
///
/// `code` is the vendor's numeric error code (0 when the vendor does not
/// report one); `message` is the driver's own text. Recognizers map the
/// code into the shared taxonomy and keep the whole value for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    /// Vendor-specific numeric error code.
    pub code: i32,
    /// Vendor-supplied error message.
    pub message: String,
}

impl NativeError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        NativeError {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for NativeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for NativeError {}

/// Result of a raw driver call, carrying the unclassified vendor error.
pub type NativeResult<T> = std::result::Result<T, NativeError>;

/// Error type for all database access operations.
///
/// The taxonomy separates three failure families:
/// - driver resolution/instantiation (`Driver`) — fatal, never retried;
/// - parameter binding (`UnhandledType`) — fatal for that statement;
/// - classified database errors (`DuplicateKey`, `Unknown`) — produced by
///   the recognizer chain from a `NativeError`.
#[derive(Error, Debug)]
pub enum SqlGateError {
    /// Driver resolution or instantiation failed
    #[error("Driver error: {0}")]
    Driver(String),

    /// A parameter value had no applicable bind conversion
    #[error("Cannot pass a {type_name} value as parameter {index} of a SQL statement")]
    UnhandledType {
        type_name: &'static str,
        /// 1-based position of the offending parameter
        index: usize,
    },

    /// Unique/primary key violation recognized from a vendor error code
    #[error("Duplicate key: {0}")]
    DuplicateKey(NativeError),

    /// Database error with no dialect-specific classification
    #[error("Database error: {0}")]
    Unknown(NativeError),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Collectors read rows outside any dialect context, so a native error
/// escaping one stays unclassified.
impl From<NativeError> for SqlGateError {
    fn from(native: NativeError) -> Self {
        SqlGateError::Unknown(native)
    }
}

impl SqlGateError {
    /// The original native error, when this value wraps one.
    pub fn native(&self) -> Option<&NativeError> {
        match self {
            SqlGateError::DuplicateKey(e) | SqlGateError::Unknown(e) => Some(e),
            _ => None,
        }
    }
}

/// Type alias for Result to use SqlGateError as the error type.
pub type Result<T> = std::result::Result<T, SqlGateError>;
