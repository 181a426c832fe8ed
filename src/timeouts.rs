//! Timeout configuration for chat-link client operations.

use std::time::Duration;

/// Timeout configuration for HTTP and realtime operations.
///
/// # Examples
///
/// ```rust
/// use chat_link::ChatLinkTimeouts;
/// use std::time::Duration;
///
/// // Defaults (recommended for most cases)
/// let timeouts = ChatLinkTimeouts::default();
///
/// // Aggressive timeouts for local development
/// let timeouts = ChatLinkTimeouts::fast();
///
/// // Custom
/// let timeouts = ChatLinkTimeouts {
///     connection_timeout: Duration::from_secs(60),
///     ..ChatLinkTimeouts::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ChatLinkTimeouts {
    /// Timeout for establishing connections (TCP + TLS + WebSocket upgrade).
    /// Default: 10 seconds.
    pub connection_timeout: Duration,

    /// Timeout for a full HTTP request/response cycle.
    /// Default: 30 seconds.
    pub request_timeout: Duration,

    /// Keep-alive ping interval for the realtime connection.
    /// Set to 0 to disable keep-alive pings.
    /// Default: 20 seconds.
    pub keepalive_interval: Duration,

    /// Maximum time to wait for a Pong (or any frame) after a keepalive Ping.
    /// When nothing arrives within this window the connection is considered
    /// dead and torn down for reconnection. Set to 0 to disable.
    /// Default: 5 seconds.
    pub pong_timeout: Duration,
}

impl Default for ChatLinkTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(20),
            pong_timeout: Duration::from_secs(5),
        }
    }
}

impl ChatLinkTimeouts {
    /// Timeouts optimized for localhost development and tests.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
            keepalive_interval: Duration::from_secs(15),
            pong_timeout: Duration::from_secs(2),
        }
    }

    /// Timeouts optimized for high-latency or unreliable networks.
    pub fn relaxed() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            keepalive_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
        }
    }

    /// `true` when the duration means "no timeout".
    pub fn is_no_timeout(d: Duration) -> bool {
        d.is_zero()
    }
}
