//! Field registry mapping plain format tokens to extractor functions.
//!
//! A registry is assembled once through a [`RegistryBuilder`] and is
//! read-only afterwards, so any number of formatters can share it across
//! threads without locking.

use crate::error::{Error, Result};
use crate::info::{RequestInfo, ResponseFlag};
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const START_TIME: &str = "START_TIME";
pub const REQUEST_RECEIVED_DURATION: &str = "REQUEST_RECEIVED_DURATION";
pub const RESPONSE_RECEIVED_DURATION: &str = "RESPONSE_RECEIVED_DURATION";
pub const BYTES_SENT: &str = "BYTES_SENT";
pub const BYTES_RECEIVED: &str = "BYTES_RECEIVED";
pub const PROTOCOL: &str = "PROTOCOL";
pub const RESPONSE_CODE: &str = "RESPONSE_CODE";
pub const DURATION: &str = "DURATION";
pub const RESPONSE_FLAG: &str = "RESPONSE_FLAG";
pub const UPSTREAM_LOCAL_ADDRESS: &str = "UPSTREAM_LOCAL_ADDRESS";
pub const DOWNSTREAM_LOCAL_ADDRESS: &str = "DOWNSTREAM_LOCAL_ADDRESS";
pub const DOWNSTREAM_REMOTE_ADDRESS: &str = "DOWNSTREAM_REMOTE_ADDRESS";
pub const UPSTREAM_HOST_SELECTED: &str = "UPSTREAM_HOST_SELECTED";

/// Text rendered for optional values that are absent.
pub const NIL: &str = "nil";

/// A function rendering one field of a request. Extractors never fail.
pub type Extractor = Arc<dyn Fn(&dyn RequestInfo) -> String + Send + Sync>;

static GLOBAL: OnceCell<Arc<FieldRegistry>> = OnceCell::new();

/// Immutable mapping from token name to extractor.
#[derive(Clone)]
pub struct FieldRegistry {
    extractors: HashMap<String, Extractor>,
}

impl FieldRegistry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Look up the extractor registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<&Extractor> {
        self.extractors.get(name)
    }

    /// Check whether `name` has an extractor.
    pub fn contains(&self, name: &str) -> bool {
        self.extractors.contains_key(name)
    }

    /// Iterate over the registered token names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.extractors.keys().map(|k| k.as_str())
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Check whether no field is registered.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl Default for FieldRegistry {
    /// The registry carrying the built-in extractors.
    fn default() -> Self {
        RegistryBuilder::with_defaults().build()
    }
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("FieldRegistry").field("fields", &names).finish()
    }
}

/// Populates a [`FieldRegistry`].
///
/// Registering a name twice keeps the last extractor.
///
/// # Example
///
/// ```rust
/// use rsal::{RegistryBuilder, RequestInfo, RequestRecord};
///
/// let registry = RegistryBuilder::with_defaults()
///     .register("STATUS_CLASS", |info: &dyn RequestInfo| {
///         format!("{}xx", info.response_code() / 100)
///     })
///     .build();
///
/// let extractor = registry.lookup("STATUS_CLASS").unwrap();
/// let info: &dyn RequestInfo = &RequestRecord::new().with_response_code(503);
/// assert_eq!(extractor(info), "5xx");
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    extractors: HashMap<String, Extractor>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder pre-populated with the built-in extractors.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(START_TIME, start_time)
            .register(REQUEST_RECEIVED_DURATION, request_received_duration)
            .register(RESPONSE_RECEIVED_DURATION, response_received_duration)
            .register(BYTES_SENT, bytes_sent)
            .register(BYTES_RECEIVED, bytes_received)
            .register(PROTOCOL, protocol)
            .register(RESPONSE_CODE, response_code)
            .register(DURATION, duration)
            .register(RESPONSE_FLAG, response_flag)
            .register(UPSTREAM_LOCAL_ADDRESS, upstream_local_address)
            .register(DOWNSTREAM_LOCAL_ADDRESS, downstream_local_address)
            .register(DOWNSTREAM_REMOTE_ADDRESS, downstream_remote_address)
            .register(UPSTREAM_HOST_SELECTED, upstream_host_selected)
    }

    /// Add or replace the extractor for `name`.
    pub fn register<F>(mut self, name: impl Into<String>, extractor: F) -> Self
    where
        F: Fn(&dyn RequestInfo) -> String + Send + Sync + 'static,
    {
        self.extractors.insert(name.into(), Arc::new(extractor));
        self
    }

    /// Finish building.
    pub fn build(self) -> FieldRegistry {
        FieldRegistry {
            extractors: self.extractors,
        }
    }
}

/// Get the process-wide registry.
///
/// Unless [`install`] ran first, this is the built-in registry.
pub fn global() -> Arc<FieldRegistry> {
    GLOBAL
        .get_or_init(|| Arc::new(FieldRegistry::default()))
        .clone()
}

/// Replace the process-wide registry.
///
/// Only one write is ever accepted, and only before the first call to
/// [`global`]; later calls return [`Error::RegistryInitialized`].
pub fn install(registry: FieldRegistry) -> Result<()> {
    GLOBAL
        .set(Arc::new(registry))
        .map_err(|_| Error::RegistryInitialized)
}

fn format_duration(d: Duration) -> String {
    format!("{:?}", d)
}

fn format_address(address: Option<SocketAddr>) -> String {
    address.map_or_else(|| NIL.to_string(), |a| a.to_string())
}

fn to_datetime(time: SystemTime) -> Option<DateTime<Utc>> {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => {
            let secs = i64::try_from(after.as_secs()).ok()?;
            DateTime::<Utc>::from_timestamp(secs, after.subsec_nanos())
        }
        Err(e) => {
            let before = e.duration();
            let mut secs = i64::try_from(before.as_secs()).ok()?.checked_neg()?;
            let mut nanos = before.subsec_nanos();
            if nanos > 0 {
                secs = secs.checked_sub(1)?;
                nanos = 1_000_000_000 - nanos;
            }
            DateTime::<Utc>::from_timestamp(secs, nanos)
        }
    }
}

/// Request arrival time, RFC 3339 in UTC, or `nil` outside the calendar range.
pub fn start_time(info: &dyn RequestInfo) -> String {
    to_datetime(info.start_time()).map_or_else(
        || NIL.to_string(),
        |t| t.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// Time between request arrival and upstream dispatch.
pub fn request_received_duration(info: &dyn RequestInfo) -> String {
    format_duration(info.request_received_duration())
}

/// Time between request arrival and response completion.
pub fn response_received_duration(info: &dyn RequestInfo) -> String {
    format_duration(info.response_received_duration())
}

/// Bytes sent downstream, base 10.
pub fn bytes_sent(info: &dyn RequestInfo) -> String {
    info.bytes_sent().to_string()
}

/// Bytes received from downstream, base 10.
pub fn bytes_received(info: &dyn RequestInfo) -> String {
    info.bytes_received().to_string()
}

/// Protocol identifier.
pub fn protocol(info: &dyn RequestInfo) -> String {
    info.protocol().to_string()
}

/// Response status code, base 10.
pub fn response_code(info: &dyn RequestInfo) -> String {
    info.response_code().to_string()
}

/// Total elapsed time of the request.
pub fn duration(info: &dyn RequestInfo) -> String {
    format_duration(info.duration())
}

/// Response flag predicate evaluated with the empty flag set.
pub fn response_flag(info: &dyn RequestInfo) -> String {
    info.has_response_flag(ResponseFlag::default()).to_string()
}

/// Local address of the upstream connection, or `nil`.
pub fn upstream_local_address(info: &dyn RequestInfo) -> String {
    format_address(info.upstream_local_address())
}

/// Local address the downstream connected to, or `nil`.
pub fn downstream_local_address(info: &dyn RequestInfo) -> String {
    format_address(info.downstream_local_address())
}

/// Remote address of the downstream client, or `nil`.
pub fn downstream_remote_address(info: &dyn RequestInfo) -> String {
    format_address(info.downstream_remote_address())
}

/// Name of the selected upstream host, or `nil`.
pub fn upstream_host_selected(info: &dyn RequestInfo) -> String {
    info.upstream_host()
        .map_or_else(|| NIL.to_string(), |h| h.hostname().to_string())
}
