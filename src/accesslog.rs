//! Access log entry point: filter, render, append.

use crate::error::Result;
use crate::formatter::{AccessLogFormatter, Formatter, Headers};
use crate::info::RequestInfo;
use crate::sink::{self, Sink};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decides whether a request is written to the access log.
///
/// Any `Fn(&Headers, &dyn RequestInfo) -> bool` closure is a filter.
pub trait AccessLogFilter: Send + Sync {
    /// Return `false` to suppress the line for this request.
    fn decide(&self, request_headers: &Headers, info: &dyn RequestInfo) -> bool;
}

impl<F> AccessLogFilter for F
where
    F: Fn(&Headers, &dyn RequestInfo) -> bool + Send + Sync,
{
    fn decide(&self, request_headers: &Headers, info: &dyn RequestInfo) -> bool {
        self(request_headers, info)
    }
}

/// An access log bound to one output.
///
/// Built once per configured log and shared by every request; [`AccessLog::log`]
/// takes `&self` and is safe to call from many threads at once.
///
/// # Example
///
/// ```rust
/// use rsal::{AccessLog, AccessLogFormatter, Headers, MemorySink, RequestRecord};
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemorySink::new());
/// let log = AccessLog::with_sink(
///     sink.clone(),
///     None,
///     AccessLogFormatter::new("%RESPONSE_CODE% %BYTES_SENT%")?,
/// );
///
/// let info = RequestRecord::new().with_response_code(200).with_bytes_sent(612);
/// log.log(&Headers::new(), &Headers::new(), &info);
///
/// assert_eq!(sink.lines(), ["200 612"]);
/// # Ok::<(), rsal::Error>(())
/// ```
pub struct AccessLog {
    filter: Option<Box<dyn AccessLogFilter>>,
    formatter: AccessLogFormatter,
    sink: Arc<dyn Sink>,
}

impl AccessLog {
    /// Create an access log writing to `output`.
    ///
    /// `format` is compiled before `output` is resolved with
    /// [`sink::acquire`], so a bad format never creates the output file. An
    /// empty `format` selects the default format.
    ///
    /// # Errors
    ///
    /// [`Error::OutputUnavailable`](crate::Error::OutputUnavailable) if the
    /// output cannot be opened, and
    /// [`Error::MalformedFormat`](crate::Error::MalformedFormat) if `format`
    /// does not parse.
    pub fn new(
        output: &str,
        filter: Option<Box<dyn AccessLogFilter>>,
        format: &str,
    ) -> Result<Self> {
        let formatter = AccessLogFormatter::new(format)?;
        let sink = sink::acquire(output)?;
        debug!(output, format, filtered = filter.is_some(), "access log created");

        Ok(Self::with_sink(sink, filter, formatter))
    }

    /// Create an access log around an existing sink and formatter.
    pub fn with_sink(
        sink: Arc<dyn Sink>,
        filter: Option<Box<dyn AccessLogFilter>>,
        formatter: AccessLogFormatter,
    ) -> Self {
        Self {
            filter,
            formatter,
            sink,
        }
    }

    /// Get the formatter rendering this log's lines.
    pub fn formatter(&self) -> &AccessLogFormatter {
        &self.formatter
    }

    /// Log one completed request.
    ///
    /// Nothing is written when the filter rejects the request. Write failures
    /// are reported through `tracing` and otherwise ignored.
    pub fn log(
        &self,
        request_headers: &Headers,
        response_headers: &Headers,
        info: &dyn RequestInfo,
    ) {
        if let Some(filter) = &self.filter {
            if !filter.decide(request_headers, info) {
                debug!("access log line suppressed by filter");
                return;
            }
        }

        let line = self.formatter.format(request_headers, response_headers, info);
        if let Err(e) = self.sink.append_line(&line) {
            warn!(error = %e, "failed to write access log line");
        }
    }
}

impl fmt::Debug for AccessLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessLog")
            .field("filtered", &self.filter.is_some())
            .field("formatter", &self.formatter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::info::RequestRecord;
    use crate::sink::MemorySink;
    use std::io;

    struct FailingSink;

    impl Sink for FailingSink {
        fn append_line(&self, _line: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    fn memory_log(
        filter: Option<Box<dyn AccessLogFilter>>,
        format: &str,
    ) -> (AccessLog, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let log = AccessLog::with_sink(
            sink.clone(),
            filter,
            AccessLogFormatter::new(format).unwrap(),
        );
        (log, sink)
    }

    #[test]
    fn test_no_filter_always_logs() {
        let (log, sink) = memory_log(None, "%RESPONSE_CODE%");
        let info = RequestRecord::new().with_response_code(204);

        log.log(&Headers::new(), &Headers::new(), &info);
        log.log(&Headers::new(), &Headers::new(), &info);

        assert_eq!(sink.lines(), ["204", "204"]);
    }

    #[test]
    fn test_filter_rejects() {
        let filter = |_: &Headers, _: &dyn RequestInfo| false;
        let (log, sink) = memory_log(Some(Box::new(filter)), "%RESPONSE_CODE%");

        log.log(&Headers::new(), &Headers::new(), &RequestRecord::new());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_filter_sees_request_headers_and_info() {
        let filter = |headers: &Headers, info: &dyn RequestInfo| {
            headers.contains_key("X-Log") && info.response_code() >= 500
        };
        let (log, sink) = memory_log(Some(Box::new(filter)), "%RESPONSE_CODE%");

        let mut marked = Headers::new();
        marked.insert("X-Log".to_string(), "1".to_string());
        let ok = RequestRecord::new().with_response_code(200);
        let failed = RequestRecord::new().with_response_code(503);

        log.log(&marked, &Headers::new(), &ok);
        log.log(&Headers::new(), &Headers::new(), &failed);
        log.log(&marked, &Headers::new(), &failed);

        assert_eq!(sink.lines(), ["503"]);
    }

    #[test]
    fn test_write_failure_is_absorbed() {
        let log = AccessLog::with_sink(
            Arc::new(FailingSink),
            None,
            AccessLogFormatter::new("%PROTOCOL%").unwrap(),
        );
        log.log(&Headers::new(), &Headers::new(), &RequestRecord::new());
    }

    #[test]
    fn test_new_rejects_malformed_format() {
        let err = AccessLog::new("stdout", None, "%START_TIME% oops").unwrap_err();
        assert!(matches!(err, Error::MalformedFormat { .. }));
    }

    #[test]
    fn test_malformed_format_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");

        let err = AccessLog::new(path.to_str().unwrap(), None, "%PROTOCOL% bad").unwrap_err();
        assert!(matches!(err, Error::MalformedFormat { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_out_of_range_start_time_is_logged() {
        let (log, sink) = memory_log(None, "%START_TIME% %RESPONSE_CODE%");
        let far_future = std::time::SystemTime::UNIX_EPOCH
            + std::time::Duration::from_secs(1 << 45);
        let info = RequestRecord::new()
            .with_start_time(far_future)
            .with_response_code(200);

        log.log(&Headers::new(), &Headers::new(), &info);
        assert_eq!(sink.lines(), ["nil 200"]);
    }
}
