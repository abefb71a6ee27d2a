//! OpenAPI document for the public, auth and admin endpoints, served at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::{
    api::{
        handlers::{attributes, auth, cars, health, inquiries, users},
        models::{
            attributes::{AttributeCreate, AttributeKind, AttributeResponse, AttributeUpdate},
            auth::{ChangePasswordRequest, LoginRequest, PrincipalResponse, SessionEnded},
            cars::{ActiveToggle, CarCreate, CarResponse, CarSort, CarSummary, CarUpdate, FeaturedToggle},
            inquiries::{InquiryCreate, InquiryResponse, InquiryStatus, InquiryStatusUpdate},
            responses::{Deleted, ErrorResponse},
            users::{UserCreate, UserResponse, UserUpdate},
        },
    },
    auth::permissions::{Permission, Role},
};

/// Session cookie set by `POST /api/auth/login`.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "CookieAuth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "showroom_session",
                    "Session cookie set by the login endpoint. The cookie name is configurable.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Showroom API",
        description = "Vehicle listings, search attributes and inquiries for the dealership website, plus the back office API that manages them.\n\nEvery response is an envelope: `{\"success\": true, \"data\": ...}` or `{\"success\": false, \"error\": ..., \"message\": ...}`."
    ),
    modifiers(&SecurityAddon),
    paths(
        cars::list_public_cars,
        cars::list_featured_cars,
        cars::get_public_car,
        attributes::list_public_attributes,
        inquiries::submit_inquiry,
        auth::login,
        auth::logout,
        auth::get_current_user,
        auth::change_password,
        cars::list_cars,
        cars::get_car,
        cars::create_car,
        cars::update_car,
        cars::toggle_featured,
        cars::toggle_active,
        cars::delete_car,
        inquiries::list_inquiries,
        inquiries::get_inquiry,
        inquiries::update_inquiry_status,
        inquiries::delete_inquiry,
        attributes::list_attributes,
        attributes::create_attribute,
        attributes::update_attribute,
        attributes::delete_attribute,
        users::list_users,
        users::create_user,
        users::update_user,
        users::delete_user,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        ErrorResponse,
        Deleted,
        CarCreate,
        CarUpdate,
        CarResponse,
        CarSummary,
        CarSort,
        FeaturedToggle,
        ActiveToggle,
        InquiryCreate,
        InquiryStatusUpdate,
        InquiryResponse,
        InquiryStatus,
        AttributeCreate,
        AttributeUpdate,
        AttributeResponse,
        AttributeKind,
        LoginRequest,
        ChangePasswordRequest,
        PrincipalResponse,
        SessionEnded,
        UserCreate,
        UserUpdate,
        UserResponse,
        Role,
        Permission,
        health::HealthStatus,
    )),
    tags(
        (name = "cars", description = "Public vehicle listings"),
        (name = "attributes", description = "Search form reference values"),
        (name = "inquiries", description = "Customer contact form"),
        (name = "auth", description = "Back office sessions"),
        (name = "admin", description = "Back office management, permission checked per operation"),
        (name = "health", description = "Liveness and readiness probes"),
    )
)]
pub struct ApiDoc;
