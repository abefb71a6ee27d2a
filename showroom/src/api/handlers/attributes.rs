//! Search attributes: the reference values (makes, body types, colours...) offered by the
//! website's search form.

use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

use crate::{
    AppState,
    api::{
        extractors::{JsonBody, PathId, QueryParams},
        models::{
            attributes::{AttributeCreate, AttributeResponse, AttributeUpdate, ListAttributesQuery},
            responses::{ApiResponse, Deleted, ErrorResponse},
        },
    },
    auth::permissions::{RequiresPermission, require},
    db::{
        models::attributes::{AttributeCreateDBRequest, AttributeFilter, AttributeUpdateDBRequest},
        store::AttributeStore,
    },
    errors::{Error, Result},
};

#[utoipa::path(
    get,
    path = "/api/attributes",
    tag = "attributes",
    summary = "List active search attributes",
    params(ListAttributesQuery),
    responses(
        (status = 200, description = "Active attributes ordered by kind, sort order and value", body = ApiResponse<Vec<AttributeResponse>>),
        (status = 400, description = "Unknown kind", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_public_attributes(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListAttributesQuery>,
) -> Result<Json<ApiResponse<Vec<AttributeResponse>>>> {
    let filter = AttributeFilter {
        kind: query.kind,
        active_only: true,
    };
    let store = state.db.connection().await?;
    let attributes = store.list_attributes(&filter).await?;

    Ok(Json(ApiResponse::ok(attributes.into_iter().map(Into::into).collect())))
}

#[utoipa::path(
    get,
    path = "/api/admin/attributes",
    tag = "admin",
    summary = "List all search attributes",
    params(ListAttributesQuery),
    responses(
        (status = 200, description = "All attributes, including inactive ones", body = ApiResponse<Vec<AttributeResponse>>),
        (status = 403, description = "Missing MANAGE_ATTRIBUTES", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_attributes(
    State(state): State<AppState>,
    _: RequiresPermission<require::ManageAttributes>,
    QueryParams(query): QueryParams<ListAttributesQuery>,
) -> Result<Json<ApiResponse<Vec<AttributeResponse>>>> {
    let filter = AttributeFilter {
        kind: query.kind,
        active_only: false,
    };
    let store = state.db.connection().await?;
    let attributes = store.list_attributes(&filter).await?;

    Ok(Json(ApiResponse::ok(attributes.into_iter().map(Into::into).collect())))
}

#[utoipa::path(
    post,
    path = "/api/admin/attributes",
    tag = "admin",
    summary = "Create search attribute",
    request_body = AttributeCreate,
    responses(
        (status = 201, description = "Attribute created", body = ApiResponse<AttributeResponse>),
        (status = 400, description = "Missing kind or value", body = ErrorResponse),
        (status = 409, description = "Kind and value already exist", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_attribute(
    State(state): State<AppState>,
    RequiresPermission(principal, ..): RequiresPermission<require::ManageAttributes>,
    JsonBody(body): JsonBody<AttributeCreate>,
) -> Result<(StatusCode, Json<ApiResponse<AttributeResponse>>)> {
    let request = AttributeCreateDBRequest::try_from(body)?;
    let store = state.db.connection().await?;
    let attribute = store.create_attribute(&request).await?;

    info!(attribute_id = %attribute.id, kind = %attribute.kind, user_id = %principal.id, "Attribute created");
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message(attribute.into(), "Attribute created"))))
}

#[utoipa::path(
    patch,
    path = "/api/admin/attributes/{attribute_id}",
    tag = "admin",
    summary = "Update search attribute",
    params(("attribute_id" = uuid::Uuid, Path, description = "Attribute ID")),
    request_body = AttributeUpdate,
    responses(
        (status = 200, description = "Updated attribute", body = ApiResponse<AttributeResponse>),
        (status = 404, description = "Attribute not found", body = ErrorResponse),
        (status = 409, description = "Kind and value already exist", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_attribute(
    State(state): State<AppState>,
    _: RequiresPermission<require::ManageAttributes>,
    PathId(attribute_id): PathId,
    JsonBody(body): JsonBody<AttributeUpdate>,
) -> Result<Json<ApiResponse<AttributeResponse>>> {
    let request = AttributeUpdateDBRequest::try_from(body)?;
    let store = state.db.connection().await?;
    let attribute = store
        .update_attribute(attribute_id, &request)
        .await?
        .ok_or_else(|| Error::not_found("Attribute", attribute_id))?;

    Ok(Json(ApiResponse::with_message(attribute.into(), "Attribute updated")))
}

#[utoipa::path(
    delete,
    path = "/api/admin/attributes/{attribute_id}",
    tag = "admin",
    summary = "Delete search attribute",
    params(("attribute_id" = uuid::Uuid, Path, description = "Attribute ID")),
    responses(
        (status = 200, description = "Attribute deleted", body = ApiResponse<Deleted>),
        (status = 404, description = "Attribute not found", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_attribute(
    State(state): State<AppState>,
    _: RequiresPermission<require::ManageAttributes>,
    PathId(attribute_id): PathId,
) -> Result<Json<ApiResponse<Deleted>>> {
    let store = state.db.connection().await?;
    if !store.delete_attribute(attribute_id).await? {
        return Err(Error::not_found("Attribute", attribute_id));
    }

    Ok(Json(ApiResponse::with_message(Deleted { id: attribute_id }, "Attribute deleted")))
}
