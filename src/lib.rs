//! # rsal - Rust Access Log
//!
//! Access log line rendering for network proxies.
//!
//! This library provides functionality to:
//! - Compile `%TOKEN%` format strings into per-category field lists
//! - Resolve fields from request metadata through an extensible registry
//! - Pull request and response header values into the line
//! - Filter requests and append rendered lines to a sink
//!
//! ## Quick Start
//!
//! ```rust
//! use rsal::{AccessLogFormatter, Formatter, Headers, RequestRecord};
//!
//! let formatter = AccessLogFormatter::new("%RESP.Server% %RESPONSE_CODE% %REQ.Host%")?;
//!
//! let mut request_headers = Headers::new();
//! request_headers.insert("Host".to_string(), "example.com".to_string());
//! let mut response_headers = Headers::new();
//! response_headers.insert("Server".to_string(), "edge-1".to_string());
//! let info = RequestRecord::new().with_response_code(200);
//!
//! let line = formatter.format(&request_headers, &response_headers, &info);
//! assert_eq!(line, "200 REQ.example.com RESP.edge-1");
//! # Ok::<(), rsal::Error>(())
//! ```
//!
//! ## Format strings
//!
//! - Tokens are wrapped in `%` and separated by single spaces
//! - `%REQ.<name>%` and `%RESP.<name>%` render request and response headers
//! - Every other token names a field in the [`FieldRegistry`]
//! - Lines list request info fields, then request headers, then response
//!   headers, whatever their order in the format string
//! - Unknown fields and missing headers are skipped
//! - An empty format string selects [`DEFAULT_FORMAT`]
//!
//! ## Features
//!
//! - **Optional Serde Support**: (De)serialize [`AccessLogConfig`] and
//!   [`RequestRecord`] when the `serde` feature is enabled

pub mod accesslog;
pub mod config;
pub mod error;
pub mod format;
pub mod formatter;
pub mod info;
pub mod registry;
pub mod sink;

// Re-export main types for convenience
pub use accesslog::{AccessLog, AccessLogFilter};
pub use config::AccessLogConfig;
pub use error::{Error, Result};
pub use format::{compile, CompiledFormat, DEFAULT_FORMAT, REQ_HEADER_PREFIX, RESP_HEADER_PREFIX};
pub use formatter::{AccessLogFormatter, Formatter, Headers, LineFormatter};
pub use info::{HostInfo, RequestInfo, RequestRecord, ResponseFlag, UpstreamHost};
pub use registry::{Extractor, FieldRegistry, RegistryBuilder};
pub use sink::{FileSink, MemorySink, Sink, StderrSink, StdoutSink};
