//! Centralized error handling for the orders pipeline.
//!
//! Errors fall into two groups:
//!
//! - **Fatal**: a missing input file, a missing expected column, a column
//!   that cannot be read as its declared type, or an output that cannot be
//!   written. These abort the run before any output is moved into place.
//! - **Row-level**: critical-field gaps and unparseable dates. These are not
//!   errors at all; the stages count them and carry on.
//!
//! ```
//! use orders_etl::error::EtlError;
//!
//! fn describe(err: &EtlError) -> &'static str {
//!     match err {
//!         EtlError::MissingInput(_) => "input file missing",
//!         EtlError::MissingColumn { .. } => "schema drift",
//!         _ => "other failure",
//!     }
//! }
//! ```
//!
//! The `ResultExt` trait adds `.context()` to any `Result` whose error
//! converts into [`EtlError`]:
//!
//! ```no_run
//! use orders_etl::error::ResultExt as _;
//!
//! fn load() -> orders_etl::error::Result<String> {
//!     std::fs::read_to_string("data/ecommerce_orders.csv").context("Failed to read orders")
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

/// Main error type for pipeline operations.
#[derive(Debug)]
pub enum EtlError {
    /// I/O errors (file operations)
    Io(std::io::Error),

    /// An expected input file does not exist or is not a file
    MissingInput(PathBuf),

    /// An input table lacks a column the pipeline requires
    MissingColumn { table: String, column: String },

    /// Data processing errors (Polars, type casts, etc.)
    DataProcessing(String),

    /// Configuration errors
    Config(String),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::MissingInput(path) => write!(f, "Input file not found: {}", path.display()),
            Self::MissingColumn { table, column } => {
                write!(f, "Column '{column}' not found in {table} table")
            }
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EtlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for EtlError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for EtlError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<EtlError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| wrap(msg.into(), e.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| wrap(f(), e.into()))
    }
}

// Fatal schema and input errors keep their variant so callers can still
// match on them after context is attached.
fn wrap(msg: String, err: EtlError) -> EtlError {
    match err {
        EtlError::MissingInput(_) | EtlError::MissingColumn { .. } => err,
        EtlError::DataProcessing(inner) => EtlError::DataProcessing(format!("{msg}: {inner}")),
        other => EtlError::Other(format!("{msg}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EtlError::MissingColumn {
            table: "orders".to_owned(),
            column: "order_id".to_owned(),
        };
        assert_eq!(err.to_string(), "Column 'order_id' not found in orders table");
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file.txt",
        ));

        let result: Result<()> = result.context("Failed to read file");
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read file")
        );
    }

    #[test]
    fn test_context_keeps_fatal_variants() {
        let result: Result<()> = Err(EtlError::MissingInput(PathBuf::from("data/x.csv")));
        let result = result.context("Failed to load orders");
        assert!(matches!(result, Err(EtlError::MissingInput(_))));
    }
}
