//! Error types for the rsal library.

use thiserror::Error;

/// Result type alias for rsal operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building or driving an access log.
///
/// Only construction-time problems are ever returned to callers. The
/// `UnknownField` and `MissingHeader` variants describe render-time
/// anomalies; the formatter reports them as debug diagnostics and moves on.
#[derive(Error, Debug)]
pub enum Error {
    /// The log sink could not be acquired.
    #[error("access log output '{target}' is unavailable: {source}")]
    OutputUnavailable {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// A token in the format string is not wrapped in delimiters.
    #[error("malformed token '{token}' in access log format '{format}'")]
    MalformedFormat { token: String, format: String },

    /// A plain token has no extractor in the field registry.
    #[error("unknown access log field '{field}'")]
    UnknownField { field: String },

    /// A header token was not present in the header mapping.
    #[error("header '{header}' not present")]
    MissingHeader { header: String },

    /// The process-wide field registry was already initialized.
    #[error("field registry is already initialized")]
    RegistryInitialized,
}

impl Error {
    /// Create a new output unavailable error.
    pub fn output_unavailable(target: impl Into<String>, source: std::io::Error) -> Self {
        Self::OutputUnavailable {
            target: target.into(),
            source,
        }
    }

    /// Create a new malformed format error.
    pub fn malformed_format(token: impl Into<String>, format: impl Into<String>) -> Self {
        Self::MalformedFormat {
            token: token.into(),
            format: format.into(),
        }
    }

    /// Create a new unknown field error.
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }

    /// Create a new missing header error.
    pub fn missing_header(header: impl Into<String>) -> Self {
        Self::MissingHeader {
            header: header.into(),
        }
    }
}
