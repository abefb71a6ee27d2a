//! JWT session token creation and verification, and the session cookie lifecycle.
//!
//! Sessions are stateless: the token is the whole session. Logging out clears the cookie on
//! the client, but a copy of the token captured elsewhere keeps validating until `exp`.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{
    errors::AuthError,
    permissions::Role,
    principal::Principal,
};
use crate::{config::Config, errors::Error, types::UserId};

/// JWT session claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,   // Subject (user ID)
    pub email: String, // User email
    pub name: String,  // Display name
    pub role: Role,    // Account role, permissions are derived from it
    pub jti: Uuid,     // Token ID
    pub iat: i64,      // Issued at
    pub exp: i64,      // Expiration time
}

impl SessionClaims {
    /// Create new session claims for a principal
    pub fn new(principal: &Principal, config: &Config) -> Self {
        let now = Utc::now();
        let exp = now + config.auth.security.jwt_expiry;

        Self {
            sub: principal.id,
            email: principal.email.clone(),
            name: principal.name.clone(),
            role: principal.role,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }
}

/// Create a signed session token for a principal
pub fn create_session_token(principal: &Principal, config: &Config) -> Result<String, Error> {
    let claims = SessionClaims::new(principal, config);
    encode_claims(&claims, config)
}

pub(crate) fn encode_claims(claims: &SessionClaims, config: &Config) -> Result<String, Error> {
    let secret_key = config.secret_key.as_ref().ok_or_else(|| Error::Internal {
        operation: "JWT sessions: secret_key is required".to_string(),
    })?;

    let key = EncodingKey::from_secret(secret_key.as_bytes());
    encode(&Header::default(), claims, &key).map_err(|e| Error::Internal {
        operation: format!("create JWT: {e}"),
    })
}

/// Verify and decode a session token.
///
/// Every failure is reported as [`AuthError::Unauthenticated`]; the reason is only logged.
pub fn verify_session_token(token: &str, config: &Config) -> Result<SessionClaims, AuthError> {
    let Some(secret_key) = config.secret_key.as_ref() else {
        tracing::error!("JWT sessions: secret_key is not configured, rejecting session");
        return Err(AuthError::Unauthenticated);
    };

    let key = DecodingKey::from_secret(secret_key.as_bytes());
    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("Rejected session token: {:?}", e.kind());
            AuthError::Unauthenticated
        })
}

/// `Set-Cookie` value carrying a freshly issued session token
pub fn session_cookie(token: &str, config: &Config) -> String {
    let session = &config.auth.session;
    let max_age = config.auth.security.jwt_expiry.as_secs();
    let secure = if session.cookie_secure { "; Secure" } else { "" };

    format!(
        "{}={}; Path=/; HttpOnly{}; SameSite={}; Max-Age={}",
        session.cookie_name, token, secure, session.cookie_same_site, max_age
    )
}

/// `Set-Cookie` value instructing the client to discard its session cookie
pub fn cleared_session_cookie(config: &Config) -> String {
    let session = &config.auth.session;
    let secure = if session.cookie_secure { "; Secure" } else { "" };

    format!(
        "{}=; Path=/; HttpOnly{}; SameSite={}; Max-Age=0",
        session.cookie_name, secure, session.cookie_same_site
    )
}
