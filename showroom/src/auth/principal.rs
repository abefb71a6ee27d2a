//! The auth guard: turns a request's session token into a [`Principal`].

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use tracing::{instrument, trace};

use super::{
    errors::{AuthError, Result},
    permissions::{Permission, Role},
    session::{self, SessionClaims},
};
use crate::{AppState, config::Config, errors::Error, types::UserId};

/// Resolved caller for one request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl Principal {
    /// Permission set of this principal, derived from its role.
    pub fn permissions(&self) -> &'static [Permission] {
        self.role.permissions()
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    pub fn require(&self, permission: Permission) -> Result<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(AuthError::Forbidden { required: permission })
        }
    }
}

impl From<SessionClaims> for Principal {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            role: claims.role,
        }
    }
}

/// Every session token candidate carried by the request, cookies first, then a bearer token.
fn session_tokens<'a>(headers: &'a HeaderMap, cookie_name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    let cookies = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(move |cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name == cookie_name && !value.is_empty()).then_some(value)
        });

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    cookies.chain(bearer)
}

/// Validate the session carried by `headers` and, if given, check `required` against the role.
///
/// Performs no store I/O. A missing, malformed, badly signed, or expired token all produce the
/// same [`AuthError::Unauthenticated`].
#[instrument(skip_all, fields(required = ?required))]
pub fn authorize(headers: &HeaderMap, config: &Config, required: Option<Permission>) -> Result<Principal> {
    let principal = session_tokens(headers, &config.auth.session.cookie_name)
        .find_map(|token| session::verify_session_token(token, config).ok())
        .map(Principal::from)
        .ok_or_else(|| {
            trace!("No valid session token on request");
            AuthError::Unauthenticated
        })?;

    if let Some(permission) = required {
        principal.require(permission)?;
    }

    trace!(user_id = %principal.id, role = %principal.role, "Request authorized");
    Ok(principal)
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        Ok(authorize(&parts.headers, &state.config, None)?)
    }
}
