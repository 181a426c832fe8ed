//! Bearer-token authentication for HTTP requests and the realtime handshake.
//!
//! The platform authenticates every call with a single opaque bearer token.
//! HTTP requests carry it as an `Authorization: Bearer` header; the realtime
//! transport carries it as a `token` query parameter at connection time.

use crate::error::Result;
use crate::token::{SharedTokenStore, TokenStore};
use reqwest::Url;

/// Authentication state resolved from the token store at call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Bearer token authentication.
    Bearer(String),
    /// No credential stored (unauthenticated).
    None,
}

impl Auth {
    /// Resolve the current credential from the shared store.
    ///
    /// Called before every authenticated HTTP request and before every
    /// realtime connect/reconnect, so a token replaced mid-session takes
    /// effect on the next call without rebuilding the client.
    pub fn from_store(store: &SharedTokenStore) -> Result<Self> {
        Ok(match store.get()? {
            Some(token) => Auth::Bearer(token),
            None => Auth::None,
        })
    }

    /// Attach the `Authorization: Bearer` header when a token is present.
    pub fn apply_to_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::None => request,
        }
    }

    /// Attach the token as a `token` query parameter on the WebSocket URL.
    ///
    /// The realtime server reads the credential from the connection request,
    /// not from a header.
    pub fn apply_to_ws_url(&self, url: &mut Url) {
        if let Auth::Bearer(token) = self {
            url.query_pairs_mut().append_pair("token", token);
        }
    }

    /// `true` when a credential is present.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Auth::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{MemoryTokenStore, TokenStore};
    use std::sync::Arc;

    #[test]
    fn resolves_bearer_from_store() {
        let store: SharedTokenStore = Arc::new(MemoryTokenStore::with_token("tok_1"));
        let auth = Auth::from_store(&store).unwrap();
        assert_eq!(auth, Auth::Bearer("tok_1".to_string()));
        assert!(auth.is_authenticated());
    }

    #[test]
    fn resolves_none_from_empty_store() {
        let store: SharedTokenStore = Arc::new(MemoryTokenStore::new());
        let auth = Auth::from_store(&store).unwrap();
        assert_eq!(auth, Auth::None);
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn resolve_sees_cleared_token() {
        let mem = Arc::new(MemoryTokenStore::with_token("tok_1"));
        let store: SharedTokenStore = mem.clone();
        mem.clear().unwrap();
        assert_eq!(Auth::from_store(&store).unwrap(), Auth::None);
    }

    #[test]
    fn ws_url_carries_token_parameter() {
        let mut url = Url::parse("ws://localhost:4000/").unwrap();
        Auth::Bearer("tok_ws".to_string()).apply_to_ws_url(&mut url);
        assert_eq!(url.query(), Some("token=tok_ws"));
    }

    #[test]
    fn ws_url_unchanged_without_token() {
        let mut url = Url::parse("ws://localhost:4000/").unwrap();
        Auth::None.apply_to_ws_url(&mut url);
        assert_eq!(url.query(), None);
    }
}
