use serde::{Deserialize, Serialize};

/// Connection-level options for the realtime transport.
///
/// These control reconnection behavior for the single shared connection.
/// Separate from [`ChatLinkTimeouts`](crate::ChatLinkTimeouts), which covers
/// per-operation deadlines.
///
/// # Example
///
/// ```rust
/// use chat_link::ConnectionOptions;
///
/// let options = ConnectionOptions::default()
///     .with_auto_reconnect(true)
///     .with_reconnect_delay_ms(2000)
///     .with_max_reconnect_attempts(Some(10));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Automatically reconnect after a transport-level disconnect.
    /// Default: true.
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Initial delay in milliseconds between reconnection attempts.
    /// Doubled on every failure up to `max_reconnect_delay_ms`.
    /// Default: 1000.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Cap for the exponential reconnection backoff.
    /// Default: 30000.
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Give up after this many consecutive failed reconnection attempts.
    /// Default: None (retry forever).
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30000
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_delay_ms: 1000,
            max_reconnect_delay_ms: 30000,
            max_reconnect_attempts: None,
        }
    }
}

impl ConnectionOptions {
    /// Enable or disable automatic reconnection.
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the initial reconnection delay.
    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    /// Set the backoff cap.
    pub fn with_max_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.max_reconnect_delay_ms = delay_ms;
        self
    }

    /// Limit the number of reconnection attempts.
    pub fn with_max_reconnect_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Backoff delay in milliseconds for the given zero-based attempt.
    pub(crate) fn backoff_delay_ms(&self, attempt: u32) -> u64 {
        std::cmp::min(
            self.reconnect_delay_ms
                .saturating_mul(2u64.saturating_pow(attempt)),
            self.max_reconnect_delay_ms,
        )
    }
}
