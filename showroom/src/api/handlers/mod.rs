pub mod attributes;
pub mod auth;
pub mod cars;
pub mod health;
pub mod inquiries;
pub mod users;

use axum::http::Uri;

use crate::errors::Error;

/// Fallback for unmatched routes, so they also answer with the error envelope.
pub async fn not_found(uri: Uri) -> Error {
    Error::NoRoute {
        path: uri.path().to_string(),
    }
}
