//! Credential check and session issue/teardown.

use tracing::{info, instrument};

use super::{
    errors::AuthError,
    password::{self, Argon2Params},
    principal::Principal,
    session,
};
use crate::{config::Config, db::store::Store, errors::Error};

/// Hash a password on a blocking thread so Argon2 does not stall the runtime.
pub async fn hash_password_blocking(input: String, params: Argon2Params) -> Result<String, Error> {
    tokio::task::spawn_blocking(move || password::hash_password(&input, params))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })?
}

/// Verify a password on a blocking thread so Argon2 does not stall the runtime.
pub async fn verify_password_blocking(input: String, hash: String) -> Result<bool, Error> {
    tokio::task::spawn_blocking(move || password::verify_password(&input, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })?
}

/// Check `email`/`password` and issue a session token.
///
/// Unknown email and wrong password both fail with [`AuthError::InvalidCredentials`], and both
/// run one Argon2 verification, so neither the response nor its latency tells them apart.
#[instrument(skip_all, err)]
pub async fn login(store: &dyn Store, email: &str, password: &str, config: &Config) -> Result<(Principal, String), Error> {
    let params = Argon2Params::from(&config.auth.password);

    let Some(user) = store.get_user_by_email(email).await? else {
        let input = password.to_string();
        tokio::task::spawn_blocking(move || password::verify_unknown_account(&input, params))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("spawn password verification task: {e}"),
            })??;
        return Err(AuthError::InvalidCredentials.into());
    };

    if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let principal = Principal {
        id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
    };
    let token = session::create_session_token(&principal, config)?;

    if let Err(e) = store.record_login(principal.id).await {
        tracing::warn!(error = %e, "Failed to record last login");
    }

    info!(user_id = %principal.id, role = %principal.role, "User logged in");
    Ok((principal, token))
}

/// `Set-Cookie` value that makes the client drop its session.
///
/// The token itself stays valid until it expires; there is no server-side session to end.
pub fn logout(config: &Config) -> String {
    session::cleared_session_cookie(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{permissions::Role, principal::authorize},
        db::{in_memory::MemoryStore, models::users::UserCreateDBRequest, store::UserStore},
        test_utils::create_test_config,
    };
    use axum::http::{HeaderMap, HeaderValue, header};

    async fn store_with_user(config: &Config) -> MemoryStore {
        let store = MemoryStore::new();
        let hash = password::hash_password("correct horse", Argon2Params::from(&config.auth.password)).unwrap();
        store
            .create_user(&UserCreateDBRequest {
                email: "editor@example.org".to_string(),
                name: "Editor".to_string(),
                role: Role::Editor,
                password_hash: hash,
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let config = create_test_config();
        let store = store_with_user(&config).await;

        let (principal, token) = login(&store, "Editor@Example.org", "correct horse", &config).await.unwrap();
        assert_eq!(principal.role, Role::Editor);

        let claims = session::verify_session_token(&token, &config).unwrap();
        assert_eq!(claims.sub, principal.id);

        let user = store.get_user(principal.id).await.unwrap().unwrap();
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let config = create_test_config();
        let store = store_with_user(&config).await;

        let wrong = login(&store, "editor@example.org", "wrong", &config).await.unwrap_err();
        let unknown = login(&store, "nobody@example.org", "correct horse", &config).await.unwrap_err();

        assert!(matches!(wrong, Error::InvalidCredentials));
        assert!(matches!(unknown, Error::InvalidCredentials));
        assert_eq!(wrong.user_message(), unknown.user_message());
        assert_eq!(wrong.status_code(), unknown.status_code());
    }

    #[tokio::test]
    async fn test_logout_is_stateless() {
        let config = create_test_config();
        let store = store_with_user(&config).await;
        let (_, token) = login(&store, "editor@example.org", "correct horse", &config).await.unwrap();

        let cleared = logout(&config);
        assert!(cleared.contains("Max-Age=0"));

        // A client that honours the cleared cookie has nothing left to send
        assert_eq!(authorize(&HeaderMap::new(), &config, None).unwrap_err(), AuthError::Unauthenticated);

        // A copy of the token replayed directly still validates until it expires
        let mut headers = HeaderMap::new();
        let cookie = format!("{}={token}", config.auth.session.cookie_name);
        headers.insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
        assert!(authorize(&headers, &config, None).is_ok());
    }
}
