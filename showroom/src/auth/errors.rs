use thiserror::Error;

use super::permissions::Permission;

/// Failures produced by the auth guard and by login.
///
/// `Unauthenticated` covers a missing cookie, a bad signature, and an expired token alike;
/// callers never learn which one it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Missing permission {required}")]
    Forbidden { required: Permission },

    #[error("Invalid email or password")]
    InvalidCredentials,
}

pub type Result<T> = std::result::Result<T, AuthError>;
