use crate::{
    auth::{errors::AuthError, permissions::Permission},
    db::errors::DbError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided, or the session token did not verify
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Principal lacks the permission required by the route
    #[error("Missing permission {required}")]
    Forbidden { required: Permission },

    /// Login failed. Unknown email and wrong password both map here
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Malformed input or a rule the request breaks (400)
    #[error("{message}")]
    BadRequest { message: String },

    /// Unknown id, or a listing hidden from the public (404)
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// No route matches the request path (404)
    #[error("No route for {path}")]
    NoRoute { path: String },

    /// Duplicate email or attribute value (409)
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Something on our side failed; `operation` is logged, not returned
    #[error("Failed to {operation}")]
    Internal { operation: String },

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        Error::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest { message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } | Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } | Error::NoRoute { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::CheckViolation { .. } | DbError::NotNullViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Stable short title, sent as the `error` field of the envelope
    pub fn title(&self) -> String {
        match self {
            Error::Unauthenticated { .. } => "Unauthorized".to_string(),
            Error::Forbidden { .. } => "Forbidden".to_string(),
            Error::InvalidCredentials => "Invalid credentials".to_string(),
            Error::BadRequest { .. } => "Validation error".to_string(),
            Error::NotFound { resource, .. } => format!("{resource} not found"),
            Error::NoRoute { .. } => "Route not found".to_string(),
            Error::Conflict { .. } => "Conflict".to_string(),
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Not found".to_string(),
                DbError::UniqueViolation { .. } => "Conflict".to_string(),
                DbError::CheckViolation { .. } | DbError::NotNullViolation { .. } => "Validation error".to_string(),
                DbError::Unavailable { .. } => "Service unavailable".to_string(),
                DbError::Other(_) => "Internal server error".to_string(),
            },
        }
    }

    /// Message for the envelope. Never includes driver or store details.
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::Forbidden { required } => format!("Missing permission {required}"),
            Error::InvalidCredentials => "Invalid email or password".to_string(),
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::NoRoute { path } => format!("No route for {path}"),
            Error::Conflict { message } => message.clone(),
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { constraint, table, .. } => match (table.as_deref(), constraint.as_deref()) {
                    (Some("users"), _) => "An account with this email address already exists".to_string(),
                    (Some("car_attributes"), _) => "An attribute with this kind and value already exists".to_string(),
                    _ => "Resource already exists".to_string(),
                },
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::NotNullViolation { .. } => "Missing required fields".to_string(),
                DbError::Unavailable { .. } => "The data store is temporarily unavailable, please retry".to_string(),
                DbError::Other(_) => "Internal server error".to_string(),
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Full details go to the log, never to the client
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(DbError::Unavailable { .. }) => {
                tracing::error!("Store unavailable: {}", self);
            }
            Error::Database(_) | Error::Conflict { .. } => {
                tracing::warn!("Conflict error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::Forbidden { .. } | Error::InvalidCredentials => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } | Error::NoRoute { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = json!({
            "success": false,
            "error": self.title(),
            "message": self.user_message(),
        });

        (self.status_code(), Json(body)).into_response()
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => Error::Unauthenticated { message: None },
            AuthError::Forbidden { required } => Error::Forbidden { required },
            AuthError::InvalidCredentials => Error::InvalidCredentials,
        }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::from(AuthError::Unauthenticated).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::Forbidden {
                required: Permission::CreateCar
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(Error::bad_request("Missing required fields").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::not_found("Car", "x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::Database(DbError::Unavailable {
                message: "connection refused".to_string()
            })
            .status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::Database(DbError::Other(anyhow::anyhow!("boom"))).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_title_names_the_resource() {
        assert_eq!(Error::not_found("Car", "123").title(), "Car not found");
        assert_eq!(Error::not_found("Inquiry", "123").title(), "Inquiry not found");
    }

    #[test]
    fn test_missing_column_is_a_client_error() {
        let err = Error::Database(DbError::NotNullViolation {
            table: Some("inquiries".to_string()),
            message: "null value in column \"email\" violates not-null constraint".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "Missing required fields");
    }

    #[test]
    fn test_driver_detail_is_not_leaked() {
        let err = Error::Database(DbError::Unavailable {
            message: "password authentication failed for user \"showroom\" at 10.0.0.3".to_string(),
        });
        assert!(!err.user_message().contains("10.0.0.3"));
        assert_eq!(err.title(), "Service unavailable");

        let err = Error::Other(anyhow::anyhow!("relation \"cars\" does not exist"));
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let response = Error::bad_request("Missing required fields").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Validation error");
        assert_eq!(body["message"], "Missing required fields");
    }
}
