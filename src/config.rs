//! Access log configuration.

use crate::accesslog::{AccessLog, AccessLogFilter};
use crate::error::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where an access log writes and what each line contains.
///
/// Both fields default to empty, which means standard output and the
/// default format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AccessLogConfig {
    /// `stdout`, `stderr`, or a file path.
    pub log_path: String,
    /// Format string; see [`CompiledFormat`](crate::CompiledFormat).
    pub log_format: String,
}

impl AccessLogConfig {
    /// Create a configuration from an output target and a format string.
    pub fn new(log_path: impl Into<String>, log_format: impl Into<String>) -> Self {
        Self {
            log_path: log_path.into(),
            log_format: log_format.into(),
        }
    }
}

impl AccessLog {
    /// Create an access log from its configuration.
    pub fn from_config(
        config: &AccessLogConfig,
        filter: Option<Box<dyn AccessLogFilter>>,
    ) -> Result<Self> {
        AccessLog::new(&config.log_path, filter, &config.log_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::Headers;
    use crate::info::RequestRecord;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_from_config_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("access.log");
        let config = AccessLogConfig::new(path.to_str().unwrap(), "%PROTOCOL% %RESPONSE_CODE%");

        let log = AccessLog::from_config(&config, None).unwrap();
        let info = RequestRecord::new().with_protocol("HTTP1").with_response_code(200);
        log.log(&Headers::new(), &Headers::new(), &info);

        assert_eq!(fs::read_to_string(&path).unwrap(), "HTTP1 200\n");
    }

    #[test]
    fn test_default_config() {
        let config = AccessLogConfig::default();
        assert!(config.log_path.is_empty());
        assert!(config.log_format.is_empty());
        assert!(AccessLog::from_config(&config, None).is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_config() {
        let config: AccessLogConfig =
            serde_json::from_str(r#"{"log_path": "/var/log/proxy/access.log"}"#).unwrap();
        assert_eq!(config.log_path, "/var/log/proxy/access.log");
        assert_eq!(config.log_format, "");
    }
}
