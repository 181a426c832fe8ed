//! Data models for the chat-link client library.
//!
//! Defines the wire types exchanged with the platform: chat messages, typing
//! signals, presence state, the tagged realtime event envelopes, and the
//! login request/response pair.

pub mod client_event;
pub mod connection_options;
pub mod login;
pub mod message;
pub mod presence;
pub mod server_event;
pub mod typing;

#[cfg(test)]
mod tests;

pub use client_event::ClientEvent;
pub use connection_options::ConnectionOptions;
pub use login::{LoginRequest, LoginResponse};
pub use message::Message;
pub use presence::{PresenceSnapshot, PresenceState};
pub use server_event::ServerEvent;
pub use typing::TypingSignal;
