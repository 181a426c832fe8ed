//! Token-authenticated HTTP request layer.
//!
//! Wraps outbound calls to the platform REST API: attaches the bearer header
//! when asked, normalizes error responses, and distinguishes a 204 from a
//! real empty JSON body. Performs a single attempt per call — no retries, no
//! backoff; retry policy belongs to the caller.

use crate::auth::Auth;
use crate::error::{ChatLinkError, Result};
use crate::token::SharedTokenStore;
use log::{debug, warn};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;

/// Fallback error message when the server body carries no `message` field.
const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// Parsed response body of a successful request.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    /// Parsed JSON body. An unparsable 2xx body is tolerated and surfaces
    /// here as an empty object.
    Json(Value),
    /// Status 204 — explicit "no content", never conflated with `{}`.
    NoContent,
}

impl ApiBody {
    /// `true` for a 204 response.
    pub fn is_no_content(&self) -> bool {
        matches!(self, ApiBody::NoContent)
    }

    /// Decode the JSON body into a typed value.
    ///
    /// Fails with [`ChatLinkError::SerializationError`] on a 204, since
    /// there is nothing to decode.
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            ApiBody::Json(value) => Ok(serde_json::from_value(value)?),
            ApiBody::NoContent => Err(ChatLinkError::SerializationError(
                "Cannot decode a 204 No Content response".to_string(),
            )),
        }
    }

    /// The raw JSON value, or `None` for a 204.
    pub fn into_value(self) -> Option<Value> {
        match self {
            ApiBody::Json(value) => Some(value),
            ApiBody::NoContent => None,
        }
    }
}

/// Per-request options.
///
/// # Example
///
/// ```rust
/// use chat_link::RequestOptions;
/// use serde_json::json;
///
/// let opts = RequestOptions::new()
///     .with_body(json!({"email": "a@b.c", "password": "pw"}))
///     .with_auth(false)
///     .with_header("X-Request-Id", "42");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// JSON request body, if any.
    pub body: Option<Value>,
    /// Attach the stored bearer token. When `false` the Authorization header
    /// is never sent, even if a token is stored.
    pub auth: bool,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    /// Options for an authenticated request with no body.
    pub fn new() -> Self {
        Self {
            body: None,
            auth: true,
            headers: Vec::new(),
        }
    }

    /// Set the JSON request body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Enable or disable bearer authentication for this request.
    pub fn with_auth(mut self, auth: bool) -> Self {
        self.auth = auth;
        self
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// HTTP client for the platform REST API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http_client: reqwest::Client,
    tokens: SharedTokenStore,
}

impl ApiClient {
    pub(crate) fn new(
        base_url: String,
        http_client: reqwest::Client,
        tokens: SharedTokenStore,
    ) -> Self {
        Self {
            base_url,
            http_client,
            tokens,
        }
    }

    /// Base URL this client was built with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one HTTP request against `{base_url}{path}`.
    ///
    /// - 204 resolves to [`ApiBody::NoContent`].
    /// - Other 2xx statuses resolve to the parsed JSON body; an unparsable
    ///   body is treated as an empty object.
    /// - Non-2xx statuses fail with [`ChatLinkError::ServerError`] carrying
    ///   the body's `message` field when present, else a generic message.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<ApiBody> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http_client.request(method.clone(), &url);

        for (name, value) in &options.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }
        if options.auth {
            builder = Auth::from_store(&self.tokens)?.apply_to_request(builder);
        }

        let start = Instant::now();
        debug!("[API] {} {} (auth={})", method, url, options.auth);

        let response = builder.send().await?;
        let status = response.status();
        debug!(
            "[API] Response: status={} duration_ms={}",
            status,
            start.elapsed().as_millis()
        );

        if status.as_u16() == 204 {
            return Ok(ApiBody::NoContent);
        }

        // Tolerate unparsable bodies before the status check.
        let text = response.text().await.unwrap_or_default();
        let parsed: Value = serde_json::from_str(&text)
            .unwrap_or_else(|_| Value::Object(Default::default()));

        if status.is_success() {
            return Ok(ApiBody::Json(parsed));
        }

        let message = parsed
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());

        warn!(
            "[API] Server error: status={} message=\"{}\"",
            status, message
        );

        Err(ChatLinkError::ServerError {
            status_code: status.as_u16(),
            message,
        })
    }

    /// Authenticated GET.
    pub async fn get(&self, path: &str) -> Result<ApiBody> {
        self.request(Method::GET, path, RequestOptions::new()).await
    }

    /// Authenticated POST with a JSON body.
    pub async fn post(&self, path: &str, body: Value) -> Result<ApiBody> {
        self.request(Method::POST, path, RequestOptions::new().with_body(body))
            .await
    }

    /// Authenticated PUT with a JSON body.
    pub async fn put(&self, path: &str, body: Value) -> Result<ApiBody> {
        self.request(Method::PUT, path, RequestOptions::new().with_body(body))
            .await
    }

    /// Authenticated DELETE.
    pub async fn delete(&self, path: &str) -> Result<ApiBody> {
        self.request(Method::DELETE, path, RequestOptions::new())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_content_is_distinct_from_empty_object() {
        assert!(ApiBody::NoContent.is_no_content());
        assert!(!ApiBody::Json(json!({})).is_no_content());
        assert_ne!(ApiBody::NoContent, ApiBody::Json(json!({})));
    }

    #[test]
    fn no_content_carries_no_value() {
        assert_eq!(ApiBody::NoContent.into_value(), None);
        assert_eq!(ApiBody::Json(json!({})).into_value(), Some(json!({})));
    }

    #[test]
    fn typed_decode_of_json_body() {
        #[derive(serde::Deserialize)]
        struct Pong {
            ok: bool,
        }
        let body = ApiBody::Json(json!({"ok": true}));
        assert!(body.json::<Pong>().unwrap().ok);
    }

    #[test]
    fn typed_decode_of_no_content_fails() {
        assert!(ApiBody::NoContent.json::<serde_json::Value>().is_err());
    }

    #[test]
    fn request_options_defaults() {
        let opts = RequestOptions::new();
        assert!(opts.auth);
        assert!(opts.body.is_none());
        assert!(opts.headers.is_empty());
    }
}
