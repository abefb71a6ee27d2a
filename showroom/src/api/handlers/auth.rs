use axum::{Json, extract::State};
use tracing::info;

use crate::{
    AppState,
    api::{
        extractors::JsonBody,
        models::{
            auth::{ChangePasswordRequest, LoginRequest, LoginResponse, LogoutResponse, PrincipalResponse, SessionEnded},
            responses::{ApiResponse, ErrorResponse},
        },
    },
    auth::{
        login::{self as credentials, hash_password_blocking, verify_password_blocking},
        password::{Argon2Params, validate_password_length},
        principal::Principal,
        session,
    },
    db::{models::users::UserUpdateDBRequest, store::UserStore},
    errors::{Error, Result},
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    summary = "Log in",
    description = "Checks the credentials and sets the session cookie.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = ApiResponse<PrincipalResponse>),
        (status = 400, description = "Missing email or password", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, JsonBody(body): JsonBody<LoginRequest>) -> Result<LoginResponse> {
    let (Some(email), Some(password)) = (body.email.map(|e| e.trim().to_string()), body.password) else {
        return Err(Error::bad_request("Missing required fields"));
    };
    if email.is_empty() || password.is_empty() {
        return Err(Error::bad_request("Missing required fields"));
    }

    let store = state.db.connection().await?;
    let (principal, token) = credentials::login(store.as_ref(), &email, &password, &state.config).await?;

    Ok(LoginResponse {
        body: ApiResponse::with_message(PrincipalResponse::from(&principal), "Login successful"),
        cookie: session::session_cookie(&token, &state.config),
    })
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    summary = "Log out",
    description = "Clears the session cookie. The token itself is not revoked and stays valid until it expires.",
    responses(
        (status = 200, description = "Session cookie cleared", body = ApiResponse<SessionEnded>)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> LogoutResponse {
    LogoutResponse {
        body: ApiResponse::with_message(SessionEnded { authenticated: false }, "Logged out"),
        cookie: credentials::logout(&state.config),
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    summary = "Current session",
    responses(
        (status = 200, description = "The authenticated principal", body = ApiResponse<PrincipalResponse>),
        (status = 401, description = "No valid session", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_current_user(principal: Principal) -> Json<ApiResponse<PrincipalResponse>> {
    Json(ApiResponse::ok(PrincipalResponse::from(&principal)))
}

#[utoipa::path(
    post,
    path = "/api/auth/password-change",
    tag = "auth",
    summary = "Change own password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<PrincipalResponse>),
        (status = 400, description = "Missing fields, wrong current password, or new password rejected", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse),
        (status = 404, description = "Account no longer exists", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    principal: Principal,
    JsonBody(body): JsonBody<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<PrincipalResponse>>> {
    let (Some(current), Some(new)) = (body.current_password, body.new_password) else {
        return Err(Error::bad_request("Missing required fields"));
    };
    validate_password_length(&new, &state.config.auth.password)?;

    let store = state.db.connection().await?;
    let user = store
        .get_user(principal.id)
        .await?
        .ok_or_else(|| Error::not_found("User", principal.id))?;

    if !verify_password_blocking(current, user.password_hash).await? {
        return Err(Error::bad_request("Current password is incorrect"));
    }

    let password_hash = hash_password_blocking(new, Argon2Params::from(&state.config.auth.password)).await?;
    let update = UserUpdateDBRequest {
        password_hash: Some(password_hash),
        ..Default::default()
    };
    store
        .update_user(principal.id, &update)
        .await?
        .ok_or_else(|| Error::not_found("User", principal.id))?;

    info!(user_id = %principal.id, "Password changed");
    Ok(Json(ApiResponse::with_message(PrincipalResponse::from(&principal), "Password changed")))
}

#[cfg(test)]
mod tests {
    use crate::{auth::permissions::Role, db::store::UserStore, test_utils::*};
    use axum::http::{StatusCode, header};
    use serde_json::{Value, json};

    fn cookie_pair(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn test_login_sets_cookie_that_authorizes() {
        let (server, state) = create_test_app().await;
        let user = create_test_user(&state, Role::Editor, "editor-password").await;

        let response = server
            .post("/api/auth/login")
            .json(&json!({"email": user.email, "password": "editor-password"}))
            .await;
        response.assert_status_ok();

        let set_cookie = response.header(header::SET_COOKIE).to_str().unwrap().to_string();
        assert!(set_cookie.starts_with(&format!("{}=", state.config.auth.session.cookie_name)));
        assert!(set_cookie.contains("HttpOnly"));

        let body: Value = response.json();
        assert_eq!(body["data"]["role"], json!("editor"));
        assert_eq!(body["data"]["permissions"].as_array().unwrap().len(), Role::Editor.permissions().len());

        let me = server.get("/api/auth/me").add_header(header::COOKIE, cookie_pair(&set_cookie)).await;
        me.assert_status_ok();
        let me: Value = me.json();
        assert_eq!(me["data"]["id"], json!(user.id.to_string()));
    }

    #[tokio::test]
    async fn test_login_failures_share_a_shape() {
        let (server, state) = create_test_app().await;
        let user = create_test_user(&state, Role::Viewer, "viewer-password").await;

        let wrong = server
            .post("/api/auth/login")
            .json(&json!({"email": user.email, "password": "nope-nope"}))
            .await;
        let unknown = server
            .post("/api/auth/login")
            .json(&json!({"email": "ghost@example.org", "password": "viewer-password"}))
            .await;

        wrong.assert_status(StatusCode::UNAUTHORIZED);
        unknown.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.json::<Value>(), unknown.json::<Value>());
    }

    #[tokio::test]
    async fn test_login_missing_fields() {
        let (server, _) = create_test_app().await;
        let response = server.post("/api/auth/login").json(&json!({"email": "a@b.com"})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_clears_cookie_without_revoking() {
        let (server, state) = create_test_app().await;
        let user = create_test_user(&state, Role::Admin, "admin-password").await;
        let (name, value) = session_header(&principal_for(&user), &state.config);

        let response = server.post("/api/auth/logout").add_header(name.clone(), value.clone()).await;
        response.assert_status_ok();
        let set_cookie = response.header(header::SET_COOKIE).to_str().unwrap().to_string();
        assert!(set_cookie.contains("Max-Age=0"));
        let body: Value = response.json();
        assert_eq!(body["data"]["authenticated"], json!(false));

        // The browser drops the cookie
        server.get("/api/auth/me").await.assert_status(StatusCode::UNAUTHORIZED);
        // A captured token still works until it expires
        server.get("/api/auth/me").add_header(name, value).await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_change_password() {
        let (server, state) = create_test_app().await;
        let user = create_test_user(&state, Role::Viewer, "old-password").await;
        let (name, value) = session_header(&principal_for(&user), &state.config);

        server
            .post("/api/auth/password-change")
            .add_header(name.clone(), value.clone())
            .json(&json!({"currentPassword": "not-the-password", "newPassword": "new-password"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/api/auth/password-change")
            .add_header(name, value)
            .json(&json!({"currentPassword": "old-password", "newPassword": "new-password"}))
            .await
            .assert_status_ok();

        let stored = test_store(&state).await.get_user(user.id).await.unwrap().unwrap();
        assert!(crate::auth::password::verify_password("new-password", &stored.password_hash).unwrap());

        server
            .post("/api/auth/login")
            .json(&json!({"email": user.email, "password": "new-password"}))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_me_without_session() {
        let (server, _) = create_test_app().await;
        let response = server.get("/api/auth/me").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"], json!("Unauthorized"));
    }
}
