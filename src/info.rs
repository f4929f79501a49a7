//! Per-request metadata consumed by the access log.

use std::net::SocketAddr;
use std::time::{Duration, SystemTime};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bit set describing why a response ended the way it did.
///
/// The empty set is the default flag argument the access log passes when it
/// renders `%RESPONSE_FLAG%`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResponseFlag(pub u32);

impl ResponseFlag {
    pub const NONE: ResponseFlag = ResponseFlag(0);
    pub const NO_HEALTHY_UPSTREAM: ResponseFlag = ResponseFlag(0x2);
    pub const UPSTREAM_REQUEST_TIMEOUT: ResponseFlag = ResponseFlag(0x4);
    pub const UPSTREAM_LOCAL_FAILURE: ResponseFlag = ResponseFlag(0x8);
    pub const UPSTREAM_REMOTE_RESET: ResponseFlag = ResponseFlag(0x10);
    pub const UPSTREAM_CONNECTION_FAILURE: ResponseFlag = ResponseFlag(0x20);
    pub const UPSTREAM_CONNECTION_TERMINATION: ResponseFlag = ResponseFlag(0x40);
    pub const UPSTREAM_OVERFLOW: ResponseFlag = ResponseFlag(0x80);
    pub const NO_ROUTE_FOUND: ResponseFlag = ResponseFlag(0x100);
    pub const DELAY_INJECTED: ResponseFlag = ResponseFlag(0x200);
    pub const FAULT_INJECTED: ResponseFlag = ResponseFlag(0x400);
    pub const RATE_LIMITED: ResponseFlag = ResponseFlag(0x800);

    /// Get the raw bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Check whether any bit of `other` is set in `self`.
    pub fn intersects(self, other: ResponseFlag) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for ResponseFlag {
    type Output = ResponseFlag;

    fn bitor(self, rhs: ResponseFlag) -> ResponseFlag {
        ResponseFlag(self.0 | rhs.0)
    }
}

/// An upstream host selected to serve a request.
pub trait HostInfo {
    /// The host's name, as configured in its cluster.
    fn hostname(&self) -> &str;

    /// The host's address, if it has one.
    fn address(&self) -> Option<SocketAddr> {
        None
    }
}

/// Read-only view over a completed request.
///
/// The proxy populates this while it processes a request; the access log
/// only reads it. Address and host accessors return `None` when the
/// request never got that far (no upstream selected, connection reset, ...).
pub trait RequestInfo {
    /// When the request arrived.
    fn start_time(&self) -> SystemTime;

    /// Time from arrival until the request was dispatched upstream.
    fn request_received_duration(&self) -> Duration;

    /// Time from arrival until the response completed.
    fn response_received_duration(&self) -> Duration;

    /// Bytes sent downstream.
    fn bytes_sent(&self) -> u64;

    /// Bytes received from downstream.
    fn bytes_received(&self) -> u64;

    /// Protocol identifier, e.g. `HTTP1`.
    fn protocol(&self) -> &str;

    /// Response status code.
    fn response_code(&self) -> u32;

    /// Total elapsed time since `start_time`.
    fn duration(&self) -> Duration;

    /// Check a response flag.
    fn has_response_flag(&self, flag: ResponseFlag) -> bool;

    /// Local address of the upstream connection.
    fn upstream_local_address(&self) -> Option<SocketAddr>;

    /// Local address the downstream client connected to.
    fn downstream_local_address(&self) -> Option<SocketAddr>;

    /// Address of the downstream client.
    fn downstream_remote_address(&self) -> Option<SocketAddr>;

    /// The upstream host chosen for this request.
    fn upstream_host(&self) -> Option<&dyn HostInfo>;
}

/// A plain upstream host record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpstreamHost {
    pub hostname: String,
    pub address: Option<SocketAddr>,
}

impl UpstreamHost {
    /// Create a new upstream host without an address.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            address: None,
        }
    }

    /// Attach an address to this host.
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = Some(address);
        self
    }
}

impl HostInfo for UpstreamHost {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn address(&self) -> Option<SocketAddr> {
        self.address
    }
}

/// An owned snapshot of request metadata.
///
/// This is the simplest [`RequestInfo`] implementation: every value is stored
/// as-is and returned from the matching accessor. Proxies that keep their own
/// request state can implement the trait directly instead.
///
/// # Example
///
/// ```rust
/// use rsal::{RequestInfo, RequestRecord};
///
/// let info = RequestRecord::new()
///     .with_protocol("HTTP1")
///     .with_response_code(200)
///     .with_bytes_sent(612);
///
/// assert_eq!(info.protocol(), "HTTP1");
/// assert_eq!(info.response_code(), 200);
/// assert!(info.upstream_host().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RequestRecord {
    pub start_time: SystemTime,
    pub request_received_duration: Duration,
    pub response_received_duration: Duration,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub protocol: String,
    pub response_code: u32,
    pub duration: Duration,
    pub response_flags: ResponseFlag,
    pub upstream_local_address: Option<SocketAddr>,
    pub downstream_local_address: Option<SocketAddr>,
    pub downstream_remote_address: Option<SocketAddr>,
    pub upstream_host: Option<UpstreamHost>,
}

impl RequestRecord {
    /// Create a new record starting at the Unix epoch with everything else zeroed.
    pub fn new() -> Self {
        Self {
            start_time: SystemTime::UNIX_EPOCH,
            request_received_duration: Duration::ZERO,
            response_received_duration: Duration::ZERO,
            bytes_sent: 0,
            bytes_received: 0,
            protocol: String::new(),
            response_code: 0,
            duration: Duration::ZERO,
            response_flags: ResponseFlag::NONE,
            upstream_local_address: None,
            downstream_local_address: None,
            downstream_remote_address: None,
            upstream_host: None,
        }
    }

    /// Set the arrival time.
    pub fn with_start_time(mut self, start_time: SystemTime) -> Self {
        self.start_time = start_time;
        self
    }

    /// Set the time until upstream dispatch.
    pub fn with_request_received_duration(mut self, duration: Duration) -> Self {
        self.request_received_duration = duration;
        self
    }

    /// Set the time until the response completed.
    pub fn with_response_received_duration(mut self, duration: Duration) -> Self {
        self.response_received_duration = duration;
        self
    }

    /// Set the bytes sent downstream.
    pub fn with_bytes_sent(mut self, bytes: u64) -> Self {
        self.bytes_sent = bytes;
        self
    }

    /// Set the bytes received from downstream.
    pub fn with_bytes_received(mut self, bytes: u64) -> Self {
        self.bytes_received = bytes;
        self
    }

    /// Set the protocol identifier.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Set the response status code.
    pub fn with_response_code(mut self, code: u32) -> Self {
        self.response_code = code;
        self
    }

    /// Set the total elapsed time.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set response flags. Flags accumulate across calls.
    pub fn with_response_flag(mut self, flag: ResponseFlag) -> Self {
        self.response_flags = self.response_flags | flag;
        self
    }

    /// Set the upstream connection's local address.
    pub fn with_upstream_local_address(mut self, address: SocketAddr) -> Self {
        self.upstream_local_address = Some(address);
        self
    }

    /// Set the local address the client connected to.
    pub fn with_downstream_local_address(mut self, address: SocketAddr) -> Self {
        self.downstream_local_address = Some(address);
        self
    }

    /// Set the client's address.
    pub fn with_downstream_remote_address(mut self, address: SocketAddr) -> Self {
        self.downstream_remote_address = Some(address);
        self
    }

    /// Set the selected upstream host.
    pub fn with_upstream_host(mut self, host: UpstreamHost) -> Self {
        self.upstream_host = Some(host);
        self
    }
}

impl Default for RequestRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestInfo for RequestRecord {
    fn start_time(&self) -> SystemTime {
        self.start_time
    }

    fn request_received_duration(&self) -> Duration {
        self.request_received_duration
    }

    fn response_received_duration(&self) -> Duration {
        self.response_received_duration
    }

    fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn response_code(&self) -> u32 {
        self.response_code
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn has_response_flag(&self, flag: ResponseFlag) -> bool {
        self.response_flags.intersects(flag)
    }

    fn upstream_local_address(&self) -> Option<SocketAddr> {
        self.upstream_local_address
    }

    fn downstream_local_address(&self) -> Option<SocketAddr> {
        self.downstream_local_address
    }

    fn downstream_remote_address(&self) -> Option<SocketAddr> {
        self.downstream_remote_address
    }

    fn upstream_host(&self) -> Option<&dyn HostInfo> {
        self.upstream_host.as_ref().map(|h| h as &dyn HostInfo)
    }
}
