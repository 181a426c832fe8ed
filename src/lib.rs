//! Rust client library for the chat platform: authenticated REST requests
//! plus realtime messaging and presence over WebSocket.
//!
//! The crate has three layers:
//!
//! - [`token`] — pluggable credential storage ([`TokenStore`]), in-memory or
//!   on disk.
//! - [`api`] — the REST request layer ([`ApiClient`]): bearer auth from the
//!   token store, JSON bodies, uniform error extraction.
//! - [`realtime`] — the realtime layer ([`RealtimeClient`]): one shared,
//!   lazily-created WebSocket connection with typed event subscriptions,
//!   presence watching, keepalive, and automatic reconnection.
//!
//! [`ChatLinkClient`] ties the three together behind a builder.
//!
//! # Examples
//!
//! ```rust,no_run
//! use chat_link::ChatLinkClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ChatLinkClient::builder()
//!     .base_url("http://localhost:4000/api")
//!     .build()?;
//!
//! client.login("alice@example.com", "secret123").await?;
//!
//! let mut sub = client.realtime().on_new_message(|message| {
//!     println!("{}: {}", message.sender_id, message.content);
//! });
//! client.realtime().watch_presence(["3", "7"]);
//!
//! // ... later
//! sub.unsubscribe();
//! client.logout()?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod event_handlers;
pub mod models;
pub mod realtime;
pub mod registry;
pub mod timeouts;
pub mod token;

pub use api::{ApiBody, ApiClient, RequestOptions};
pub use client::{ChatLinkClient, ChatLinkClientBuilder};
pub use error::{ChatLinkError, Result};
pub use event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
pub use models::{
    ClientEvent, ConnectionOptions, LoginRequest, LoginResponse, Message, PresenceSnapshot,
    PresenceState, ServerEvent, TypingSignal,
};
pub use realtime::{ConnectOutcome, ConnectionState, RealtimeClient};
pub use registry::{EventFamily, Subscription};
pub use timeouts::ChatLinkTimeouts;
pub use token::{FileTokenStore, MemoryTokenStore, SharedTokenStore, TokenStore};
