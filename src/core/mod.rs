/// Core Module for SQLGate
///
/// Shared infrastructure for the access layer: the error taxonomy used by
/// every component and the closed parameter-value variant the binder
/// dispatches over.
pub mod error;
pub mod params;

// Re-export commonly used types for convenience
pub use error::{NativeError, NativeResult, Result, SqlGateError};
pub use params::ParamValue;
