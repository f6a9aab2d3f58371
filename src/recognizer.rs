/// Error Recognizer Module
///
/// Classifies native vendor errors into the shared taxonomy. The dispatch
/// logic lives here once: dialects contribute only their code→kind table,
/// and every code without a table entry wraps into `Unknown` with the
/// original native error kept for diagnostics.
use crate::core::{NativeError, SqlGateError};

/// Classified meanings a vendor error code can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unique or primary key violation
    DuplicateKey,
}

/// Maps native error codes to normalized errors via a dialect's code table.
///
/// Recognizers are stateless and safe to share across all sessions of a
/// dialect.
#[derive(Debug, Clone, Copy)]
pub struct ErrorRecognizer {
    codes: &'static [(i32, ErrorKind)],
}

impl ErrorRecognizer {
    pub fn new(codes: &'static [(i32, ErrorKind)]) -> Self {
        ErrorRecognizer { codes }
    }

    /// Classifies a native error. Unmatched codes yield `Unknown`.
    pub fn recognize(&self, native: NativeError) -> SqlGateError {
        let kind = self
            .codes
            .iter()
            .find(|(code, _)| *code == native.code)
            .map(|(_, kind)| *kind);

        match kind {
            Some(ErrorKind::DuplicateKey) => SqlGateError::DuplicateKey(native),
            None => SqlGateError::Unknown(native),
        }
    }
}
