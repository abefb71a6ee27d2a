use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

use crate::{
    AppState,
    api::{
        extractors::{JsonBody, PathId, QueryParams},
        models::{
            inquiries::is_plausible_email,
            pagination::{DEFAULT_LIMIT, MAX_LIMIT, Pagination},
            responses::{ApiResponse, Deleted, ErrorResponse, Page},
            users::{UserCreate, UserResponse, UserUpdate},
        },
    },
    auth::{
        login::hash_password_blocking,
        password::{Argon2Params, validate_password_length},
        permissions::{RequiresPermission, Role, require},
    },
    db::{
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
        store::UserStore,
    },
    errors::{Error, Result},
};

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "admin",
    summary = "List back office accounts",
    params(Pagination),
    responses(
        (status = 200, description = "One page of accounts", body = ApiResponse<Page<UserResponse>>),
        (status = 403, description = "Missing MANAGE_USERS", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    _: RequiresPermission<require::ManageUsers>,
    QueryParams(pagination): QueryParams<Pagination>,
) -> Result<Json<ApiResponse<Page<UserResponse>>>> {
    let skip = pagination.skip();
    let limit = pagination.limit_with(DEFAULT_LIMIT, MAX_LIMIT);

    let store = state.db.connection().await?;
    let users = store.list_users(skip, limit).await?;
    let total = store.count_users().await?;

    Ok(Json(ApiResponse::ok(Page::new(
        users.into_iter().map(Into::into).collect(),
        total,
        skip,
        limit,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "admin",
    summary = "Create back office account",
    request_body = UserCreate,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<UserResponse>),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    RequiresPermission(principal, ..): RequiresPermission<require::ManageUsers>,
    JsonBody(body): JsonBody<UserCreate>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    let (Some(email), Some(name), Some(password)) = (non_empty(body.email), non_empty(body.name), body.password) else {
        return Err(Error::bad_request("Missing required fields"));
    };
    if !is_plausible_email(&email) {
        return Err(Error::bad_request("Invalid email address"));
    }
    validate_password_length(&password, &state.config.auth.password)?;

    let password_hash = hash_password_blocking(password, Argon2Params::from(&state.config.auth.password)).await?;
    let request = UserCreateDBRequest {
        email: email.to_lowercase(),
        name,
        role: body.role.unwrap_or(Role::Viewer),
        password_hash,
    };

    let store = state.db.connection().await?;
    let user = store.create_user(&request).await?;

    info!(user_id = %user.id, role = %user.role, created_by = %principal.id, "Account created");
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message(user.into(), "User created"))))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{user_id}",
    tag = "admin",
    summary = "Update back office account",
    description = "Change name, role or password. Takes effect for the account's next login; sessions already issued keep their role until they expire.",
    params(("user_id" = uuid::Uuid, Path, description = "User ID")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated account", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    _: RequiresPermission<require::ManageUsers>,
    PathId(user_id): PathId,
    JsonBody(body): JsonBody<UserUpdate>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    if matches!(&body.name, Some(name) if name.trim().is_empty()) {
        return Err(Error::bad_request("Name cannot be empty"));
    }

    let password_hash = match body.password {
        Some(password) => {
            validate_password_length(&password, &state.config.auth.password)?;
            Some(hash_password_blocking(password, Argon2Params::from(&state.config.auth.password)).await?)
        }
        None => None,
    };

    let request = UserUpdateDBRequest {
        name: non_empty(body.name),
        role: body.role,
        password_hash,
    };

    let store = state.db.connection().await?;
    let user = store
        .update_user(user_id, &request)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))?;

    Ok(Json(ApiResponse::with_message(user.into(), "User updated")))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}",
    tag = "admin",
    summary = "Delete back office account",
    params(("user_id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account deleted", body = ApiResponse<Deleted>),
        (status = 400, description = "Cannot delete your own account", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    RequiresPermission(principal, ..): RequiresPermission<require::ManageUsers>,
    PathId(user_id): PathId,
) -> Result<Json<ApiResponse<Deleted>>> {
    if principal.id == user_id {
        return Err(Error::bad_request("You cannot delete your own account"));
    }

    let store = state.db.connection().await?;
    if !store.delete_user(user_id).await? {
        return Err(Error::not_found("User", user_id));
    }

    info!(user_id = %user_id, deleted_by = %principal.id, "Account deleted");
    Ok(Json(ApiResponse::with_message(Deleted { id: user_id }, "User deleted")))
}
