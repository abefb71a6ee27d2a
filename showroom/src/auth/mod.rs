//! Authentication and authorization.
//!
//! Admin sessions are signed JWTs carried in an HttpOnly cookie (an `Authorization: Bearer`
//! header is accepted as well). The guard in [`principal`] verifies the token on every
//! privileged request and derives the caller's permissions from its role via the static table
//! in [`permissions`]; it never touches the store.
//!
//! - [`session`]: token issue/verify and the session cookie
//! - [`password`]: Argon2id hashing
//! - [`login`]: credential check and logout
//! - [`permissions`]: roles, permissions, and the [`RequiresPermission`](permissions::RequiresPermission) extractor
//! - [`principal`]: the resolved caller and the `authorize` guard

pub mod errors;
pub mod login;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod session;

pub use errors::AuthError;
