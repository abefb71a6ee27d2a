use std::collections::HashMap;

use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

use crate::{
    AppState,
    api::{
        extractors::{JsonBody, PathId, QueryParams},
        models::{
            cars::CarSummary,
            inquiries::{InquiryCreate, InquiryResponse, InquiryStatusUpdate, ListInquiriesQuery},
            pagination::{DEFAULT_LIMIT, MAX_LIMIT},
            responses::{ApiResponse, Deleted, ErrorResponse, Page},
        },
    },
    auth::permissions::{RequiresPermission, require},
    db::{
        models::{
            cars::CarDBResponse,
            inquiries::{InquiryCreateDBRequest, InquiryDBResponse, InquiryFilter},
        },
        store::{CarStore, InquiryStore, Store},
    },
    errors::{Error, Result},
    types::CarId,
};

/// Attach the referenced listing to each inquiry. Unknown listings resolve to `car: null`.
async fn with_cars(store: &dyn Store, inquiries: Vec<InquiryDBResponse>) -> Result<Vec<InquiryResponse>> {
    let mut ids: Vec<CarId> = inquiries.iter().filter_map(|inquiry| inquiry.car_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let cars: HashMap<CarId, CarDBResponse> = store.get_cars(&ids).await?;

    Ok(inquiries
        .into_iter()
        .map(|inquiry| {
            let car = inquiry.car_id.and_then(|id| cars.get(&id)).map(CarSummary::from);
            InquiryResponse::from(inquiry).with_car(car)
        })
        .collect())
}

#[utoipa::path(
    post,
    path = "/api/inquiries",
    tag = "inquiries",
    summary = "Submit an inquiry",
    description = "Public contact form. `carId` is optional and is not checked against existing listings.",
    request_body = InquiryCreate,
    responses(
        (status = 201, description = "Inquiry stored with status `new`", body = ApiResponse<InquiryResponse>),
        (status = 400, description = "Missing required fields", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn submit_inquiry(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<InquiryCreate>,
) -> Result<(StatusCode, Json<ApiResponse<InquiryResponse>>)> {
    let request = InquiryCreateDBRequest::try_from(body)?;
    let store = state.db.connection().await?;
    let inquiry = store.create_inquiry(&request).await?;

    info!(inquiry_id = %inquiry.id, car_id = ?inquiry.car_id, "Inquiry received");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(inquiry.into(), "Thank you, we will be in touch shortly")),
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/inquiries",
    tag = "admin",
    summary = "List inquiries",
    description = "Newest first. Each inquiry carries a summary of its listing, or `null` when the listing is unknown.",
    params(ListInquiriesQuery),
    responses(
        (status = 200, description = "One page of inquiries", body = ApiResponse<Page<InquiryResponse>>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing READ_INQUIRIES", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_inquiries(
    State(state): State<AppState>,
    _: RequiresPermission<require::ReadInquiries>,
    QueryParams(query): QueryParams<ListInquiriesQuery>,
) -> Result<Json<ApiResponse<Page<InquiryResponse>>>> {
    let filter = InquiryFilter {
        status: query.status,
        car_id: query.car_id,
        ..InquiryFilter::new(query.pagination.skip(), query.pagination.limit_with(DEFAULT_LIMIT, MAX_LIMIT))
    };

    let store = state.db.connection().await?;
    let inquiries = store.list_inquiries(&filter).await?;
    let total = store.count_inquiries(&filter).await?;
    let items = with_cars(store.as_ref(), inquiries).await?;

    Ok(Json(ApiResponse::ok(Page::new(items, total, filter.skip, filter.limit))))
}

#[utoipa::path(
    get,
    path = "/api/admin/inquiries/{inquiry_id}",
    tag = "admin",
    summary = "Get inquiry",
    params(("inquiry_id" = uuid::Uuid, Path, description = "Inquiry ID")),
    responses(
        (status = 200, description = "Inquiry details", body = ApiResponse<InquiryResponse>),
        (status = 404, description = "Inquiry not found", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_inquiry(
    State(state): State<AppState>,
    _: RequiresPermission<require::ReadInquiries>,
    PathId(inquiry_id): PathId,
) -> Result<Json<ApiResponse<InquiryResponse>>> {
    let store = state.db.connection().await?;
    let inquiry = store
        .get_inquiry(inquiry_id)
        .await?
        .ok_or_else(|| Error::not_found("Inquiry", inquiry_id))?;

    let mut items = with_cars(store.as_ref(), vec![inquiry]).await?;
    let inquiry = items.pop().ok_or_else(|| Error::not_found("Inquiry", inquiry_id))?;
    Ok(Json(ApiResponse::ok(inquiry)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/inquiries/{inquiry_id}",
    tag = "admin",
    summary = "Update inquiry status",
    params(("inquiry_id" = uuid::Uuid, Path, description = "Inquiry ID")),
    request_body = InquiryStatusUpdate,
    responses(
        (status = 200, description = "Updated inquiry", body = ApiResponse<InquiryResponse>),
        (status = 400, description = "Missing or unknown status", body = ErrorResponse),
        (status = 404, description = "Inquiry not found", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_inquiry_status(
    State(state): State<AppState>,
    RequiresPermission(principal, ..): RequiresPermission<require::UpdateInquiries>,
    PathId(inquiry_id): PathId,
    JsonBody(body): JsonBody<InquiryStatusUpdate>,
) -> Result<Json<ApiResponse<InquiryResponse>>> {
    let status = body.status.ok_or_else(|| Error::bad_request("Missing required fields"))?;

    let store = state.db.connection().await?;
    let inquiry = store
        .update_inquiry_status(inquiry_id, status)
        .await?
        .ok_or_else(|| Error::not_found("Inquiry", inquiry_id))?;

    info!(inquiry_id = %inquiry_id, status = %status, user_id = %principal.id, "Inquiry status changed");
    let mut items = with_cars(store.as_ref(), vec![inquiry]).await?;
    let inquiry = items.pop().ok_or_else(|| Error::not_found("Inquiry", inquiry_id))?;
    Ok(Json(ApiResponse::with_message(inquiry, "Inquiry updated")))
}

#[utoipa::path(
    delete,
    path = "/api/admin/inquiries/{inquiry_id}",
    tag = "admin",
    summary = "Delete inquiry",
    params(("inquiry_id" = uuid::Uuid, Path, description = "Inquiry ID")),
    responses(
        (status = 200, description = "Inquiry deleted", body = ApiResponse<Deleted>),
        (status = 403, description = "Missing DELETE_INQUIRIES", body = ErrorResponse),
        (status = 404, description = "Inquiry not found", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_inquiry(
    State(state): State<AppState>,
    _: RequiresPermission<require::DeleteInquiries>,
    PathId(inquiry_id): PathId,
) -> Result<Json<ApiResponse<Deleted>>> {
    let store = state.db.connection().await?;
    if !store.delete_inquiry(inquiry_id).await? {
        return Err(Error::not_found("Inquiry", inquiry_id));
    }

    Ok(Json(ApiResponse::with_message(Deleted { id: inquiry_id }, "Inquiry deleted")))
}
