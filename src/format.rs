//! Access log format string compilation.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Character wrapping every token in a format string.
pub const DELIMITER: char = '%';

/// Marks a token as a request header lookup, e.g. `%REQ.Host%`.
pub const REQ_HEADER_PREFIX: &str = "REQ.";

/// Marks a token as a response header lookup, e.g. `%RESP.Content-Type%`.
pub const RESP_HEADER_PREFIX: &str = "RESP.";

/// Format used when an empty format string is supplied.
pub const DEFAULT_FORMAT: &str = "%START_TIME% %REQUEST_RECEIVED_DURATION% \
%RESPONSE_RECEIVED_DURATION% %BYTES_SENT% %BYTES_RECEIVED% %PROTOCOL% \
%RESPONSE_CODE% %DURATION% %RESPONSE_FLAG% %UPSTREAM_LOCAL_ADDRESS% \
%DOWNSTREAM_LOCAL_ADDRESS% %DOWNSTREAM_REMOTE_ADDRESS% %UPSTREAM_HOST_SELECTED%";

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^%(?P<name>.+)%$").expect("token pattern is valid")
});

/// A format string split into its three token categories.
///
/// The order of tokens inside each category follows the format string. The
/// categories themselves are always rendered request info first, then
/// request headers, then response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFormat {
    /// The format string that was compiled, after default substitution.
    format: String,
    request_info: Vec<String>,
    request_headers: Vec<String>,
    response_headers: Vec<String>,
}

impl CompiledFormat {
    /// Compile a format string.
    ///
    /// Tokens are separated by single spaces and wrapped in `%`. Tokens
    /// starting with `REQ.` or `RESP.` name headers; everything else names a
    /// registry field. An empty string compiles [`DEFAULT_FORMAT`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use rsal::CompiledFormat;
    ///
    /// let compiled = CompiledFormat::new("%RESP.X% %START_TIME% %REQ.Y%")?;
    /// assert_eq!(compiled.request_info(), ["START_TIME"]);
    /// assert_eq!(compiled.request_headers(), ["Y"]);
    /// assert_eq!(compiled.response_headers(), ["X"]);
    /// # Ok::<(), rsal::Error>(())
    /// ```
    pub fn new(format: &str) -> Result<Self> {
        let format = if format.is_empty() { DEFAULT_FORMAT } else { format };

        let mut request_info = Vec::new();
        let mut request_headers = Vec::new();
        let mut response_headers = Vec::new();

        for raw in format.split(' ') {
            let name = Self::strip_delimiters(raw, format)?;

            if let Some(header) = name.strip_prefix(REQ_HEADER_PREFIX) {
                request_headers.push(Self::header_name(header, raw, format)?);
            } else if let Some(header) = name.strip_prefix(RESP_HEADER_PREFIX) {
                response_headers.push(Self::header_name(header, raw, format)?);
            } else {
                request_info.push(name.to_string());
            }
        }

        Ok(Self {
            format: format.to_string(),
            request_info,
            request_headers,
            response_headers,
        })
    }

    /// Get the compiled format string.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Registry field names, in format order.
    pub fn request_info(&self) -> &[String] {
        &self.request_info
    }

    /// Request header names, prefix removed, in format order.
    pub fn request_headers(&self) -> &[String] {
        &self.request_headers
    }

    /// Response header names, prefix removed, in format order.
    pub fn response_headers(&self) -> &[String] {
        &self.response_headers
    }

    /// Total number of tokens across all categories.
    pub fn len(&self) -> usize {
        self.request_info.len() + self.request_headers.len() + self.response_headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<String>, Vec<String>) {
        (self.request_info, self.request_headers, self.response_headers)
    }

    /// Remove the wrapping delimiters from a raw token.
    fn strip_delimiters<'a>(raw: &'a str, format: &str) -> Result<&'a str> {
        TOKEN
            .captures(raw)
            .and_then(|c| c.name("name"))
            .map(|m| m.as_str())
            .ok_or_else(|| Error::malformed_format(raw, format))
    }

    fn header_name(header: &str, raw: &str, format: &str) -> Result<String> {
        if header.is_empty() {
            return Err(Error::malformed_format(raw, format));
        }
        Ok(header.to_string())
    }
}

/// Compile a format string. See [`CompiledFormat::new`].
pub fn compile(format: &str) -> Result<CompiledFormat> {
    CompiledFormat::new(format)
}
