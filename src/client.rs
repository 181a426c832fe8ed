//! Main chat-link client with builder pattern.
//!
//! Entry point tying together the token store, the REST API client, and the
//! realtime messaging client behind one configured handle.

use crate::{
    api::{ApiClient, RequestOptions},
    error::{ChatLinkError, Result},
    event_handlers::EventHandlers,
    models::{ConnectionOptions, LoginRequest, LoginResponse},
    realtime::RealtimeClient,
    timeouts::ChatLinkTimeouts,
    token::{MemoryTokenStore, SharedTokenStore, TokenStore},
};
use reqwest::Method;
use std::sync::Arc;

/// Main chat-link client.
///
/// Use [`ChatLinkClientBuilder`] to construct instances with custom
/// configuration. The client is cheap to clone; all clones share the token
/// store and the single realtime connection.
///
/// # Examples
///
/// ```rust,no_run
/// use chat_link::ChatLinkClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ChatLinkClient::builder()
///     .base_url("http://localhost:4000/api")
///     .build()?;
///
/// let session = client.login("alice@example.com", "secret123").await?;
/// println!("Logged in as {}", session.user_id);
///
/// let _sub = client.realtime().on_new_message(|message| {
///     println!("{}: {}", message.sender_id, message.content);
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChatLinkClient {
    api: ApiClient,
    realtime: Arc<RealtimeClient>,
    tokens: SharedTokenStore,
}

impl ChatLinkClient {
    /// Create a new builder for configuring the client
    pub fn builder() -> ChatLinkClientBuilder {
        ChatLinkClientBuilder::new()
    }

    /// REST API client sharing this client's credential.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Realtime messaging and presence client.
    pub fn realtime(&self) -> &RealtimeClient {
        &self.realtime
    }

    /// Token store backing this client.
    pub fn tokens(&self) -> &SharedTokenStore {
        &self.tokens
    }

    /// Authenticate with email and password.
    ///
    /// On success the returned token is written to the token store, so
    /// subsequent API requests and realtime connections pick it up without
    /// further wiring. The login request itself is sent unauthenticated.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        log::debug!("[AUTH] Logging in '{}'", email);

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let body = self
            .api
            .request(
                Method::POST,
                "/auth/login",
                RequestOptions::new()
                    .with_auth(false)
                    .with_body(serde_json::to_value(&request)?),
            )
            .await?;

        let response: LoginResponse = body.json()?;
        self.tokens.set(&response.token)?;
        log::info!("[AUTH] Logged in as user {}", response.user_id);
        Ok(response)
    }

    /// Discard the stored credential and tear down the realtime connection.
    pub fn logout(&self) -> Result<()> {
        self.realtime.disconnect();
        self.tokens.clear()?;
        log::info!("[AUTH] Logged out");
        Ok(())
    }

    /// Whether a credential is currently stored.
    pub fn is_authenticated(&self) -> bool {
        matches!(self.tokens.get(), Ok(Some(_)))
    }
}

/// Builder for configuring [`ChatLinkClient`] instances.
pub struct ChatLinkClientBuilder {
    base_url: Option<String>,
    token_store: Option<SharedTokenStore>,
    timeouts: ChatLinkTimeouts,
    connection_options: ConnectionOptions,
    event_handlers: EventHandlers,
}

impl ChatLinkClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            token_store: None,
            timeouts: ChatLinkTimeouts::default(),
            connection_options: ConnectionOptions::default(),
            event_handlers: EventHandlers::new(),
        }
    }

    /// Set the base URL of the platform API, e.g. `http://localhost:4000/api`.
    ///
    /// REST paths are appended to this URL as given; the realtime endpoint is
    /// derived from its bare origin.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the token store backing authentication.
    ///
    /// Defaults to an in-memory store. Use
    /// [`FileTokenStore`](crate::token::FileTokenStore) for a credential that
    /// survives restarts.
    pub fn token_store(mut self, store: SharedTokenStore) -> Self {
        self.token_store = Some(store);
        self
    }

    /// Set comprehensive timeout configuration for all operations
    pub fn timeouts(mut self, timeouts: ChatLinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set reconnection behavior for the realtime connection
    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = options;
        self
    }

    /// Set lifecycle callbacks for the realtime connection
    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.event_handlers = handlers;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ChatLinkClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| ChatLinkError::ConfigurationError("base_url is required".into()))?
            .trim_end_matches('/')
            .to_string();

        let tokens = self
            .token_store
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));

        // Pooled HTTP client with keep-alive; building it never touches the
        // network.
        let http_client = reqwest::Client::builder()
            .timeout(self.timeouts.request_timeout)
            .connect_timeout(self.timeouts.connection_timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .map_err(|e| ChatLinkError::ConfigurationError(e.to_string()))?;

        let api = ApiClient::new(base_url.clone(), http_client, Arc::clone(&tokens));

        let realtime = Arc::new(RealtimeClient::new(
            base_url,
            Arc::clone(&tokens),
            self.timeouts,
            self.connection_options,
            self.event_handlers,
        ));

        Ok(ChatLinkClient {
            api,
            realtime,
            tokens,
        })
    }
}
