//! Rendering of compiled formats into access log lines.

use crate::error::{Error, Result};
use crate::format::{CompiledFormat, REQ_HEADER_PREFIX, RESP_HEADER_PREFIX};
use crate::info::RequestInfo;
use crate::registry::{self, FieldRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Header name to header value. Keys are matched exactly, case included.
pub type Headers = HashMap<String, String>;

const SEPARATOR: char = ' ';

/// Renders part or all of an access log line for one request.
///
/// Implementations never mutate their inputs and never fail: anything they
/// cannot resolve is left out of the output.
pub trait Formatter {
    fn format(
        &self,
        request_headers: &Headers,
        response_headers: &Headers,
        info: &dyn RequestInfo,
    ) -> String;
}

/// One category of tokens taken from a compiled format.
///
/// Every variant renders its tokens as `value ` fragments, each followed by
/// a single space. Header values carry the category prefix so a reader can
/// tell request headers from response headers.
#[derive(Debug, Clone)]
pub enum LineFormatter {
    /// Registry fields resolved against the request info.
    RequestInfo {
        fields: Vec<String>,
        registry: Arc<FieldRegistry>,
    },
    /// Request header lookups.
    RequestHeaders { headers: Vec<String> },
    /// Response header lookups.
    ResponseHeaders { headers: Vec<String> },
}

impl LineFormatter {
    fn format_request_info(
        fields: &[String],
        registry: &FieldRegistry,
        info: &dyn RequestInfo,
    ) -> String {
        if fields.is_empty() {
            debug!("no request info fields in access log format");
            return String::new();
        }

        let mut out = String::new();
        for field in fields {
            match registry.lookup(field) {
                Some(extractor) => {
                    out.push_str(&extractor(info));
                    out.push(SEPARATOR);
                }
                None => debug!(error = %Error::unknown_field(field), "skipping access log field"),
            }
        }
        out
    }

    fn format_headers(names: &[String], headers: &Headers, prefix: &str) -> String {
        if names.is_empty() {
            debug!(prefix, "no header fields in access log format");
            return String::new();
        }

        let mut out = String::new();
        for name in names {
            match headers.get(name) {
                Some(value) => {
                    out.push_str(prefix);
                    out.push_str(value);
                    out.push(SEPARATOR);
                }
                None => debug!(
                    error = %Error::missing_header(name),
                    prefix,
                    "skipping access log header"
                ),
            }
        }
        out
    }
}

impl Formatter for LineFormatter {
    fn format(
        &self,
        request_headers: &Headers,
        response_headers: &Headers,
        info: &dyn RequestInfo,
    ) -> String {
        match self {
            Self::RequestInfo { fields, registry } => {
                Self::format_request_info(fields, registry, info)
            }
            Self::RequestHeaders { headers } => {
                Self::format_headers(headers, request_headers, REQ_HEADER_PREFIX)
            }
            Self::ResponseHeaders { headers } => {
                Self::format_headers(headers, response_headers, RESP_HEADER_PREFIX)
            }
        }
    }
}

/// Renders complete access log lines.
///
/// Holds one [`LineFormatter`] per token category and joins their output in
/// the fixed order request info, request headers, response headers. Token
/// order across categories in the format string is not preserved.
///
/// # Example
///
/// ```rust
/// use rsal::{AccessLogFormatter, Formatter, Headers, RequestRecord};
///
/// let formatter = AccessLogFormatter::new("%REQ.Host% %RESPONSE_CODE% %PROTOCOL%")?;
///
/// let mut request_headers = Headers::new();
/// request_headers.insert("Host".to_string(), "example.com".to_string());
/// let info = RequestRecord::new().with_protocol("HTTP1").with_response_code(200);
///
/// let line = formatter.format(&request_headers, &Headers::new(), &info);
/// assert_eq!(line, "200 HTTP1 REQ.example.com");
/// # Ok::<(), rsal::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct AccessLogFormatter {
    formatters: Vec<LineFormatter>,
}

impl AccessLogFormatter {
    /// Compile `format` against the process-wide field registry.
    pub fn new(format: &str) -> Result<Self> {
        Self::with_registry(format, registry::global())
    }

    /// Compile `format` against a specific field registry.
    pub fn with_registry(format: &str, registry: Arc<FieldRegistry>) -> Result<Self> {
        Ok(Self::from_compiled(CompiledFormat::new(format)?, registry))
    }

    /// Build from an already compiled format.
    pub fn from_compiled(compiled: CompiledFormat, registry: Arc<FieldRegistry>) -> Self {
        let (fields, request_headers, response_headers) = compiled.into_parts();
        Self {
            formatters: vec![
                LineFormatter::RequestInfo { fields, registry },
                LineFormatter::RequestHeaders {
                    headers: request_headers,
                },
                LineFormatter::ResponseHeaders {
                    headers: response_headers,
                },
            ],
        }
    }

    /// Get the per-category formatters, in rendering order.
    pub fn formatters(&self) -> &[LineFormatter] {
        &self.formatters
    }
}

impl Formatter for AccessLogFormatter {
    fn format(
        &self,
        request_headers: &Headers,
        response_headers: &Headers,
        info: &dyn RequestInfo,
    ) -> String {
        let mut line = String::new();
        for formatter in &self.formatters {
            line.push_str(&formatter.format(request_headers, response_headers, info));
        }

        if line.ends_with(SEPARATOR) {
            line.pop();
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::{RequestRecord, UpstreamHost};
    use crate::registry::RegistryBuilder;
    use std::time::{Duration, SystemTime};

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn formatter(format: &str) -> AccessLogFormatter {
        AccessLogFormatter::with_registry(format, Arc::new(FieldRegistry::default())).unwrap()
    }

    #[test]
    fn test_cross_category_order_is_fixed() {
        let formatter = formatter("%RESP.X% %START_TIME% %REQ.Y%");
        let info = RequestRecord::new();

        let line = formatter.format(
            &headers(&[("Y", "v1")]),
            &headers(&[("X", "v2")]),
            &info,
        );
        assert_eq!(line, "1970-01-01T00:00:00.000Z REQ.v1 RESP.v2");
    }

    #[test]
    fn test_order_within_category_follows_format() {
        let formatter = formatter("%REQ.b% %RESPONSE_CODE% %REQ.a% %PROTOCOL%");
        let info = RequestRecord::new().with_response_code(201).with_protocol("HTTP2");

        let line = formatter.format(&headers(&[("a", "1"), ("b", "2")]), &Headers::new(), &info);
        assert_eq!(line, "201 HTTP2 REQ.2 REQ.1");
    }

    #[test]
    fn test_unknown_field_is_skipped() {
        let formatter = formatter("%BYTES_SENT% %NOT_A_FIELD% %BYTES_RECEIVED%");
        let info = RequestRecord::new().with_bytes_sent(10).with_bytes_received(20);

        let line = formatter.format(&Headers::new(), &Headers::new(), &info);
        assert_eq!(line, "10 20");
    }

    #[test]
    fn test_missing_header_is_skipped() {
        let formatter = formatter("%REQ.a% %REQ.missing% %REQ.c% %RESP.gone%");
        let line = formatter.format(
            &headers(&[("a", "x"), ("c", "z")]),
            &headers(&[("other", "y")]),
            &RequestRecord::new(),
        );
        assert_eq!(line, "REQ.x REQ.z");
    }

    #[test]
    fn test_header_lookup_is_exact() {
        let formatter = formatter("%REQ.Host%");
        let line = formatter.format(
            &headers(&[("host", "example.com")]),
            &Headers::new(),
            &RequestRecord::new(),
        );
        assert_eq!(line, "");
    }

    #[test]
    fn test_request_header_not_read_from_response() {
        let formatter = formatter("%REQ.X% %RESP.Y%");
        let line = formatter.format(
            &headers(&[("Y", "request-side")]),
            &headers(&[("X", "response-side")]),
            &RequestRecord::new(),
        );
        assert_eq!(line, "");
    }

    #[test]
    fn test_nothing_resolves_gives_empty_line() {
        let formatter = formatter("%UNKNOWN%");
        let line = formatter.format(&Headers::new(), &Headers::new(), &RequestRecord::new());
        assert!(line.is_empty());
    }

    #[test]
    fn test_empty_header_value_keeps_prefix() {
        let formatter = formatter("%RESP.Empty%");
        let line = formatter.format(
            &Headers::new(),
            &headers(&[("Empty", "")]),
            &RequestRecord::new(),
        );
        assert_eq!(line, "RESP.");
    }

    #[test]
    fn test_default_format_line() {
        let formatter = formatter("");
        let info = RequestRecord::new()
            .with_start_time(SystemTime::UNIX_EPOCH + Duration::from_secs(60))
            .with_request_received_duration(Duration::from_millis(3))
            .with_response_received_duration(Duration::from_millis(7))
            .with_bytes_sent(300)
            .with_bytes_received(100)
            .with_protocol("HTTP1")
            .with_response_code(200)
            .with_duration(Duration::from_millis(8))
            .with_downstream_remote_address("192.168.1.5:50000".parse().unwrap())
            .with_upstream_host(UpstreamHost::new("backend-1"));

        let line = formatter.format(&Headers::new(), &Headers::new(), &info);
        assert_eq!(
            line,
            "1970-01-01T00:01:00.000Z 3ms 7ms 300 100 HTTP1 200 8ms false nil nil 192.168.1.5:50000 backend-1"
        );
    }

    #[test]
    fn test_custom_registry() {
        let registry = RegistryBuilder::new()
            .register("CODE_CLASS", |info: &dyn RequestInfo| {
                format!("{}xx", info.response_code() / 100)
            })
            .build();
        let formatter =
            AccessLogFormatter::with_registry("%CODE_CLASS% %PROTOCOL%", Arc::new(registry))
                .unwrap();

        let info = RequestRecord::new().with_response_code(502).with_protocol("HTTP1");
        let line = formatter.format(&Headers::new(), &Headers::new(), &info);
        assert_eq!(line, "5xx");
    }

    #[test]
    fn test_line_formatter_variants_keep_trailing_separator() {
        let formatter = formatter("%PROTOCOL% %REQ.a% %RESP.b%");
        let info = RequestRecord::new().with_protocol("HTTP1");
        let req = headers(&[("a", "1")]);
        let resp = headers(&[("b", "2")]);

        let parts: Vec<String> = formatter
            .formatters()
            .iter()
            .map(|f| f.format(&req, &resp, &info))
            .collect();
        assert_eq!(parts, ["HTTP1 ", "REQ.1 ", "RESP.2 "]);
    }

    #[test]
    fn test_rendering_is_repeatable() {
        let info = RequestRecord::new().with_bytes_sent(5).with_protocol("HTTP1");
        let req = headers(&[("id", "abc")]);
        let format = "%REQ.id% %BYTES_SENT% %PROTOCOL%";

        let first = formatter(format);
        let second = formatter(format);
        let a = first.format(&req, &Headers::new(), &info);
        let b = first.format(&req, &Headers::new(), &info);
        let c = second.format(&req, &Headers::new(), &info);

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, "5 HTTP1 REQ.abc");
    }
}
