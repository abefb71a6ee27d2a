//! The response envelope shared by every endpoint.
//!
//! Success: `{"success": true, "data": ..., "message"?: ...}`.
//! Errors are produced by [`crate::errors::Error`]: `{"success": false, "error": ..., "message": ...}`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Success envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: ToSchema> {
    /// Always `true`
    pub success: bool,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: ToSchema> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

/// Error envelope, documented here so it shows up in the OpenAPI document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Stable error title, e.g. "Car not found"
    pub error: String,
    /// Human readable detail, safe to show to end users
    pub message: String,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Page<T: ToSchema> {
    pub items: Vec<T>,
    /// Total number of items matching the query (before pagination)
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

impl<T: ToSchema> Page<T> {
    pub fn new(items: Vec<T>, total: i64, skip: i64, limit: i64) -> Self {
        Self { items, total, skip, limit }
    }
}

/// Payload of a successful delete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Deleted {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
}
