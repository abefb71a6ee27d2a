//! HTTP API: handlers, request/response models and extractors.
//!
//! - **Public** (`/api/cars`, `/api/attributes`, `/api/inquiries`): what the website reads and
//!   the contact form it posts
//! - **Auth** (`/api/auth/*`): login, logout, current session, password change
//! - **Admin** (`/api/admin/*`): listings, inquiries, attributes and accounts, one permission per
//!   operation
//!
//! Every response uses the envelope in [`models::responses`]. Failures are
//! [`Error`](crate::errors::Error)s and render through the same envelope, including malformed
//! bodies and query strings via [`extractors`].
//!
//! The OpenAPI reference is served at `/docs`.

pub mod extractors;
pub mod handlers;
pub mod models;
