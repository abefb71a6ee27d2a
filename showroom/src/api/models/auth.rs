use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::responses::ApiResponse;
use crate::{
    auth::{
        permissions::{Permission, Role},
        principal::Principal,
    },
    errors::Error,
    types::UserId,
};

/// Request to login
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request to change the caller's own password
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// The authenticated caller, as seen by the back office UI
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl From<&Principal> for PrincipalResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id,
            email: principal.email.clone(),
            name: principal.name.clone(),
            role: principal.role,
            permissions: principal.permissions().to_vec(),
        }
    }
}

/// Payload of a logout response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionEnded {
    pub authenticated: bool,
}

/// Successful login: the envelope plus the session cookie
pub struct LoginResponse {
    pub body: ApiResponse<PrincipalResponse>,
    pub cookie: String,
}

/// Successful logout: the envelope plus an expiring cookie
pub struct LogoutResponse {
    pub body: ApiResponse<SessionEnded>,
    pub cookie: String,
}

fn with_cookie(status: StatusCode, cookie: &str, body: impl IntoResponse) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => (status, [(header::SET_COOKIE, value)], body).into_response(),
        Err(e) => Error::Internal {
            operation: format!("build Set-Cookie header: {e}"),
        }
        .into_response(),
    }
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        with_cookie(StatusCode::OK, &self.cookie, Json(self.body))
    }
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        with_cookie(StatusCode::OK, &self.cookie, Json(self.body))
    }
}
