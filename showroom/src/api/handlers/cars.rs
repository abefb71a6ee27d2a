use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

use crate::{
    AppState,
    api::{
        extractors::{JsonBody, OptionalJsonBody, PathId, QueryParams},
        models::{
            cars::{ActiveToggle, CarCreate, CarResponse, CarUpdate, FeaturedToggle, ListCarsQuery},
            responses::{ApiResponse, Deleted, ErrorResponse, Page},
        },
    },
    auth::permissions::{RequiresPermission, require},
    config::ListingsConfig,
    db::{
        models::cars::{CarCreateDBRequest, CarFilter, CarUpdateDBRequest},
        store::{CarStore, Store},
    },
    errors::{Error, Result},
    types::CarId,
};

fn text_filter(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn car_filter(query: ListCarsQuery, listings: &ListingsConfig) -> Result<CarFilter> {
    if matches!((query.min_price, query.max_price), (Some(min), Some(max)) if min > max) {
        return Err(Error::bad_request("minPrice cannot be greater than maxPrice"));
    }
    if matches!((query.min_year, query.max_year), (Some(min), Some(max)) if min > max) {
        return Err(Error::bad_request("minYear cannot be greater than maxYear"));
    }

    let skip = query.pagination.skip();
    let limit = query.pagination.limit_with(listings.default_page_size, listings.max_page_size);

    Ok(CarFilter {
        make: text_filter(query.make),
        model: text_filter(query.model),
        body_type: text_filter(query.body_type),
        fuel_type: text_filter(query.fuel_type),
        transmission: text_filter(query.transmission),
        min_price: query.min_price,
        max_price: query.max_price,
        min_year: query.min_year,
        max_year: query.max_year,
        featured: query.featured,
        search: text_filter(query.search),
        sort: query.sort.unwrap_or_default(),
        ..CarFilter::new(skip, limit)
    })
}

async fn page_of_cars(store: &dyn Store, filter: &CarFilter) -> Result<Page<CarResponse>> {
    let cars = store.list_cars(filter).await?;
    let total = store.count_cars(filter).await?;
    Ok(Page::new(cars.into_iter().map(Into::into).collect(), total, filter.skip, filter.limit))
}

async fn apply_update(store: &dyn Store, id: CarId, request: CarUpdateDBRequest) -> Result<CarResponse> {
    store
        .update_car(id, &request)
        .await?
        .map(Into::into)
        .ok_or_else(|| Error::not_found("Car", id))
}

#[utoipa::path(
    get,
    path = "/api/cars",
    tag = "cars",
    summary = "Search listings",
    description = "Active listings only, filtered, sorted and paginated.",
    params(ListCarsQuery),
    responses(
        (status = 200, description = "One page of listings", body = ApiResponse<Page<CarResponse>>),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_public_cars(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListCarsQuery>,
) -> Result<Json<ApiResponse<Page<CarResponse>>>> {
    let filter = car_filter(query, &state.config.listings)?.active_only();
    let store = state.db.connection().await?;

    Ok(Json(ApiResponse::ok(page_of_cars(store.as_ref(), &filter).await?)))
}

#[utoipa::path(
    get,
    path = "/api/cars/featured",
    tag = "cars",
    summary = "Featured listings",
    responses(
        (status = 200, description = "Newest featured listings", body = ApiResponse<Vec<CarResponse>>),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_featured_cars(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<CarResponse>>>> {
    let filter = CarFilter {
        featured: Some(true),
        ..CarFilter::new(0, state.config.listings.featured_limit)
    }
    .active_only();

    let store = state.db.connection().await?;
    let cars = store.list_cars(&filter).await?;

    Ok(Json(ApiResponse::ok(cars.into_iter().map(Into::into).collect())))
}

#[utoipa::path(
    get,
    path = "/api/cars/{car_id}",
    tag = "cars",
    summary = "Get listing",
    params(("car_id" = uuid::Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing details", body = ApiResponse<CarResponse>),
        (status = 404, description = "Unknown or inactive listing", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_public_car(State(state): State<AppState>, PathId(car_id): PathId) -> Result<Json<ApiResponse<CarResponse>>> {
    let store = state.db.connection().await?;

    match store.get_car(car_id).await? {
        Some(car) if car.is_active => Ok(Json(ApiResponse::ok(car.into()))),
        _ => Err(Error::not_found("Car", car_id)),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/cars",
    tag = "admin",
    summary = "List all listings",
    description = "Same filters as the public search, including inactive listings.",
    params(ListCarsQuery),
    responses(
        (status = 200, description = "One page of listings", body = ApiResponse<Page<CarResponse>>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Missing READ_CARS", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_cars(
    State(state): State<AppState>,
    _: RequiresPermission<require::ReadCars>,
    QueryParams(query): QueryParams<ListCarsQuery>,
) -> Result<Json<ApiResponse<Page<CarResponse>>>> {
    let filter = car_filter(query, &state.config.listings)?;
    let store = state.db.connection().await?;

    Ok(Json(ApiResponse::ok(page_of_cars(store.as_ref(), &filter).await?)))
}

#[utoipa::path(
    get,
    path = "/api/admin/cars/{car_id}",
    tag = "admin",
    summary = "Get listing",
    params(("car_id" = uuid::Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing details", body = ApiResponse<CarResponse>),
        (status = 404, description = "Car not found", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_car(
    State(state): State<AppState>,
    _: RequiresPermission<require::ReadCars>,
    PathId(car_id): PathId,
) -> Result<Json<ApiResponse<CarResponse>>> {
    let store = state.db.connection().await?;
    let car = store.get_car(car_id).await?.ok_or_else(|| Error::not_found("Car", car_id))?;

    Ok(Json(ApiResponse::ok(car.into())))
}

#[utoipa::path(
    post,
    path = "/api/admin/cars",
    tag = "admin",
    summary = "Create listing",
    request_body = CarCreate,
    responses(
        (status = 201, description = "Listing created", body = ApiResponse<CarResponse>),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 403, description = "Missing CREATE_CAR", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_car(
    State(state): State<AppState>,
    RequiresPermission(principal, ..): RequiresPermission<require::CreateCar>,
    JsonBody(body): JsonBody<CarCreate>,
) -> Result<(StatusCode, Json<ApiResponse<CarResponse>>)> {
    let request = CarCreateDBRequest::try_from(body)?;
    let store = state.db.connection().await?;
    let car = store.create_car(&request).await?;

    info!(car_id = %car.id, user_id = %principal.id, "Listing created");
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message(car.into(), "Car created"))))
}

#[utoipa::path(
    patch,
    path = "/api/admin/cars/{car_id}",
    tag = "admin",
    summary = "Update listing",
    description = "Partial update. Omitted fields are left unchanged.",
    params(("car_id" = uuid::Uuid, Path, description = "Listing ID")),
    request_body = CarUpdate,
    responses(
        (status = 200, description = "Updated listing", body = ApiResponse<CarResponse>),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 404, description = "Car not found", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_car(
    State(state): State<AppState>,
    _: RequiresPermission<require::UpdateCar>,
    PathId(car_id): PathId,
    JsonBody(body): JsonBody<CarUpdate>,
) -> Result<Json<ApiResponse<CarResponse>>> {
    let request = CarUpdateDBRequest::try_from(body)?;
    let store = state.db.connection().await?;
    let car = apply_update(store.as_ref(), car_id, request).await?;

    Ok(Json(ApiResponse::with_message(car, "Car updated")))
}

#[utoipa::path(
    patch,
    path = "/api/admin/cars/{car_id}/featured",
    tag = "admin",
    summary = "Set or flip the featured flag",
    description = "Sets `isFeatured` to the given value, or flips it when the body is empty.",
    params(("car_id" = uuid::Uuid, Path, description = "Listing ID")),
    request_body = FeaturedToggle,
    responses(
        (status = 200, description = "Updated listing", body = ApiResponse<CarResponse>),
        (status = 404, description = "Car not found", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn toggle_featured(
    State(state): State<AppState>,
    _: RequiresPermission<require::UpdateCar>,
    PathId(car_id): PathId,
    body: OptionalJsonBody<FeaturedToggle>,
) -> Result<Json<ApiResponse<CarResponse>>> {
    let store = state.db.connection().await?;
    let current = store.get_car(car_id).await?.ok_or_else(|| Error::not_found("Car", car_id))?;
    let is_featured = body.parse()?.is_featured.unwrap_or(!current.is_featured);

    let car = apply_update(store.as_ref(), car_id, CarUpdateDBRequest::featured(is_featured)).await?;
    Ok(Json(ApiResponse::ok(car)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/cars/{car_id}/active",
    tag = "admin",
    summary = "Publish or hide a listing",
    description = "Sets `isActive` to the given value, or flips it when the body is empty.",
    params(("car_id" = uuid::Uuid, Path, description = "Listing ID")),
    request_body = ActiveToggle,
    responses(
        (status = 200, description = "Updated listing", body = ApiResponse<CarResponse>),
        (status = 404, description = "Car not found", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn toggle_active(
    State(state): State<AppState>,
    _: RequiresPermission<require::UpdateCar>,
    PathId(car_id): PathId,
    body: OptionalJsonBody<ActiveToggle>,
) -> Result<Json<ApiResponse<CarResponse>>> {
    let store = state.db.connection().await?;
    let current = store.get_car(car_id).await?.ok_or_else(|| Error::not_found("Car", car_id))?;
    let is_active = body.parse()?.is_active.unwrap_or(!current.is_active);

    let car = apply_update(store.as_ref(), car_id, CarUpdateDBRequest::active(is_active)).await?;
    Ok(Json(ApiResponse::ok(car)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/cars/{car_id}",
    tag = "admin",
    summary = "Delete listing",
    params(("car_id" = uuid::Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing deleted", body = ApiResponse<Deleted>),
        (status = 403, description = "Missing DELETE_CAR", body = ErrorResponse),
        (status = 404, description = "Car not found", body = ErrorResponse)
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_car(
    State(state): State<AppState>,
    RequiresPermission(principal, ..): RequiresPermission<require::DeleteCar>,
    PathId(car_id): PathId,
) -> Result<Json<ApiResponse<Deleted>>> {
    let store = state.db.connection().await?;
    if !store.delete_car(car_id).await? {
        return Err(Error::not_found("Car", car_id));
    }

    info!(car_id = %car_id, user_id = %principal.id, "Listing deleted");
    Ok(Json(ApiResponse::with_message(Deleted { id: car_id }, "Car deleted")))
}
