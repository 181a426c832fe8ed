use serde::{Deserialize, Serialize};

/// Request body for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email address.
    pub email: String,

    /// Account password.
    pub password: String,
}

/// Response body from a successful login or registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for subsequent authenticated calls.
    pub token: String,

    /// Identifier of the authenticated user.
    pub user_id: String,
}
