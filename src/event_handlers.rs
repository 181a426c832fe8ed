//! Connection lifecycle hooks for the realtime client.
//!
//! Transport-level connect failures and disconnects are deliberately not
//! surfaced as errors from the subscribe/emit methods; these hooks are the
//! observation channel for callers who need to react to them.
//!
//! # Example
//!
//! ```rust,no_run
//! use chat_link::{ChatLinkClient, EventHandlers};
//!
//! # fn example() -> chat_link::Result<()> {
//! let handlers = EventHandlers::new()
//!     .on_connect(|| println!("realtime connected"))
//!     .on_disconnect(|reason| println!("realtime disconnected: {reason}"))
//!     .on_error(|err| eprintln!("realtime error: {err}"));
//!
//! let client = ChatLinkClient::builder()
//!     .base_url("http://localhost:4000")
//!     .event_handlers(handlers)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

/// Reason for a disconnect event.
#[derive(Debug, Clone)]
pub struct DisconnectReason {
    /// Human-readable description of why the connection closed.
    pub message: String,
    /// WebSocket close code, if available (1000 = normal, 1006 = abnormal).
    pub code: Option<u16>,
}

impl DisconnectReason {
    /// Disconnect reason with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Disconnect reason with a message and close code.
    pub fn with_code(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code: {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Error information passed to the `on_error` hook.
#[derive(Debug, Clone)]
pub struct ConnectionError {
    /// Human-readable error message.
    pub message: String,
    /// Whether auto-reconnect may recover from this error.
    pub recoverable: bool,
}

impl ConnectionError {
    /// Create a new connection error.
    pub fn new(message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            message: message.into(),
            recoverable,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

type OnConnectCallback = Arc<dyn Fn() + Send + Sync>;
type OnDisconnectCallback = Arc<dyn Fn(DisconnectReason) + Send + Sync>;
type OnErrorCallback = Arc<dyn Fn(ConnectionError) + Send + Sync>;

/// Optional connection lifecycle callbacks.
///
/// All hooks default to unset. Hooks run on the connection task, so keep
/// them cheap and non-blocking.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub(crate) on_connect: Option<OnConnectCallback>,
    pub(crate) on_disconnect: Option<OnDisconnectCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl EventHandlers {
    /// Empty handler set (no callbacks registered).
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked after the realtime connection is established — both on the
    /// first connect and after every successful reconnect.
    pub fn on_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Invoked when the realtime connection closes, intentionally or not.
    pub fn on_disconnect(mut self, f: impl Fn(DisconnectReason) + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    /// Invoked on connection or protocol errors, including malformed frames.
    pub fn on_error(mut self, f: impl Fn(ConnectionError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub(crate) fn emit_connect(&self) {
        if let Some(cb) = &self.on_connect {
            cb();
        }
    }

    pub(crate) fn emit_disconnect(&self, reason: DisconnectReason) {
        if let Some(cb) = &self.on_disconnect {
            cb(reason);
        }
    }

    pub(crate) fn emit_error(&self, error: ConnectionError) {
        if let Some(cb) = &self.on_error {
            cb(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn hooks_fire_when_registered() {
        let connects = Arc::new(AtomicUsize::new(0));
        let disconnects = Arc::new(AtomicUsize::new(0));

        let c = connects.clone();
        let d = disconnects.clone();
        let handlers = EventHandlers::new()
            .on_connect(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .on_disconnect(move |_| {
                d.fetch_add(1, Ordering::SeqCst);
            });

        handlers.emit_connect();
        handlers.emit_connect();
        handlers.emit_disconnect(DisconnectReason::with_code("closed", 1000));

        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unset_hooks_are_noops() {
        let handlers = EventHandlers::new();
        handlers.emit_connect();
        handlers.emit_disconnect(DisconnectReason::new("gone"));
        handlers.emit_error(ConnectionError::new("boom", true));
    }

    #[test]
    fn disconnect_reason_display() {
        assert_eq!(DisconnectReason::new("gone").to_string(), "gone");
        assert_eq!(
            DisconnectReason::with_code("gone", 1006).to_string(),
            "gone (code: 1006)"
        );
    }
}
