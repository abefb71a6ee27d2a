//! # showroom: dealership listing service and admin back office
//!
//! `showroom` serves the public side of a car dealership website (vehicle listings, search
//! attributes, the inquiry form) and the authenticated back office that manages them.
//!
//! ## Architecture
//!
//! - **API layer** ([`api`]): axum handlers and the request/response types, every response wrapped
//!   in the same `{success, data | error, message}` envelope
//! - **Auth layer** ([`auth`]): cookie session tokens, the static role to permission table, and the
//!   [`RequiresPermission`](auth::permissions::RequiresPermission) extractor that guards admin routes
//! - **Data layer** ([`db`]): per-collection store traits with Postgres and in-memory backends,
//!   reached through the lazily connected [`ConnectionCache`](db::connection::ConnectionCache)
//!
//! Handlers never hold a connection of their own. They ask the [`AppState::db`] provider for the
//! process-wide store handle, which is established on first use and shared afterwards.
//!
//! ## Quick start
//!
//! ```no_run
//! use showroom::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let app = Application::new(config).await?;
//!     app.serve(async { tokio::signal::ctrl_c().await.unwrap_or(()) }).await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod types;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    http::{self, HeaderValue},
    routing::{get, patch, post},
};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
pub use types::{AttributeId, CarId, InquiryId, UserId};

use auth::{login::hash_password_blocking, password::Argon2Params, permissions::Role};
use db::{
    connection::ConnectionProvider,
    models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    store::Store,
};
use openapi::ApiDoc;

/// Handles every request needs: the cached store connection and the loaded settings.
#[derive(Clone, Builder)]
pub struct AppState {
    /// Source of the process-wide store handle
    pub db: Arc<dyn ConnectionProvider>,
    pub config: Config,
}

/// Embedded migrations for the Postgres backend.
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create or refresh the initial admin account from `admin_email` / `admin_password`.
///
/// An existing account with that email gets its password reset and its role raised to admin.
/// Does nothing when no admin password is configured.
#[instrument(skip_all, fields(email = %config.admin_email), err)]
pub async fn create_initial_admin_user(store: &dyn Store, config: &Config) -> errors::Result<()> {
    let Some(password) = config.admin_password.clone() else {
        info!("No admin password configured, skipping admin seeding");
        return Ok(());
    };

    let password_hash = hash_password_blocking(password, Argon2Params::from(&config.auth.password)).await?;

    match store.get_user_by_email(&config.admin_email).await? {
        Some(existing) => {
            let update = UserUpdateDBRequest {
                role: Some(Role::Admin),
                password_hash: Some(password_hash),
                ..Default::default()
            };
            store.update_user(existing.id, &update).await?;
            info!(user_id = %existing.id, "Refreshed initial admin user");
        }
        None => {
            let created = store
                .create_user(&UserCreateDBRequest {
                    email: config.admin_email.clone(),
                    name: config.admin_name.clone(),
                    role: Role::Admin,
                    password_hash,
                })
                .await?;
            info!(user_id = %created.id, "Created initial admin user");
        }
    }

    Ok(())
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;

    let mut cors = CorsLayer::new()
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PATCH, http::Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_credentials(cors_config.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if cors_config.allowed_origins.iter().any(|origin| origin == "*") {
        // tower-http refuses a wildcard origin combined with credentials
        anyhow::ensure!(
            !cors_config.allow_credentials,
            "CORS allowed_origins '*' cannot be combined with allow_credentials"
        );
        cors = cors.allow_origin(Any);
    } else {
        let origins = cors_config
            .allowed_origins
            .iter()
            .map(|origin| origin.parse::<HeaderValue>().with_context(|| format!("invalid CORS origin '{origin}'")))
            .collect::<anyhow::Result<Vec<_>>>()?;
        cors = cors.allow_origin(origins);
    }

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router.
///
/// - `/api/cars`, `/api/attributes`, `/api/inquiries`: public website endpoints
/// - `/api/auth/*`: login, logout, session introspection and password change
/// - `/api/admin/*`: back office CRUD, each handler guarded by its permission
/// - `/healthz`, `/readyz`: liveness and readiness
/// - `/docs`: OpenAPI reference
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    use api::handlers::{attributes, auth as auth_handlers, cars, health, inquiries, users};

    let public_routes = Router::new()
        .route("/cars", get(cars::list_public_cars))
        .route("/cars/featured", get(cars::list_featured_cars))
        .route("/cars/{car_id}", get(cars::get_public_car))
        .route("/attributes", get(attributes::list_public_attributes))
        .route("/inquiries", post(inquiries::submit_inquiry));

    let auth_routes = Router::new()
        .route("/login", post(auth_handlers::login))
        .route("/logout", post(auth_handlers::logout))
        .route("/me", get(auth_handlers::get_current_user))
        .route("/password-change", post(auth_handlers::change_password));

    let admin_routes = Router::new()
        .route("/cars", get(cars::list_cars).post(cars::create_car))
        .route("/cars/{car_id}", get(cars::get_car).patch(cars::update_car).delete(cars::delete_car))
        .route("/cars/{car_id}/featured", patch(cars::toggle_featured))
        .route("/cars/{car_id}/active", patch(cars::toggle_active))
        .route("/inquiries", get(inquiries::list_inquiries))
        .route(
            "/inquiries/{inquiry_id}",
            get(inquiries::get_inquiry)
                .patch(inquiries::update_inquiry_status)
                .delete(inquiries::delete_inquiry),
        )
        .route("/attributes", get(attributes::list_attributes).post(attributes::create_attribute))
        .route(
            "/attributes/{attribute_id}",
            patch(attributes::update_attribute).delete(attributes::delete_attribute),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{user_id}", patch(users::update_user).delete(users::delete_user));

    let api_routes = public_routes.nest("/auth", auth_routes).nest("/admin", admin_routes);

    let router = Router::new()
        .route("/healthz", get(health::liveness))
        .route("/readyz", get(health::readiness))
        .nest("/api", api_routes)
        .fallback(api::handlers::not_found)
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let router = router.layer(create_cors_layer(&state.config)?).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// A configured server: router, shared state, and the config it was built from.
pub struct Application {
    router: Router,
    app_state: AppState,
    config: Config,
}

impl Application {
    /// Build the application without touching the store.
    ///
    /// The connection cache is created here but only connects for admin seeding (when an admin
    /// password is configured) or on the first request. A store that is down at startup is
    /// logged and retried on demand.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let cache = db::connection_cache(&config.database);
        let app_state = AppState::builder().db(Arc::new(cache)).config(config.clone()).build();

        if config.admin_password.is_some() {
            match app_state.db.connection().await {
                Ok(store) => {
                    if let Err(e) = create_initial_admin_user(store.as_ref(), &config).await {
                        warn!(error = %e, "Failed to seed initial admin user");
                    }
                }
                Err(e) => warn!(error = %e, "Store unavailable at startup, skipping admin seeding"),
            }
        }

        let router = build_router(app_state.clone())?;

        Ok(Self {
            router,
            app_state,
            config,
        })
    }

    /// Shared state, for tests that need to reach the store directly.
    pub fn state(&self) -> &AppState {
        &self.app_state
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Showroom listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{in_memory::MemoryStore, store::UserStore},
        test_utils::create_test_config,
    };

    #[tokio::test]
    async fn test_seeding_creates_admin() {
        let mut config = create_test_config();
        config.admin_password = Some("hunter2hunter2".to_string());
        let store = MemoryStore::new();

        create_initial_admin_user(&store, &config).await.unwrap();

        let admin = store.get_user_by_email(&config.admin_email).await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(auth::password::verify_password("hunter2hunter2", &admin.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_seeding_refreshes_existing_account() {
        let mut config = create_test_config();
        config.admin_password = Some("first-password".to_string());
        let store = MemoryStore::new();
        create_initial_admin_user(&store, &config).await.unwrap();

        config.admin_password = Some("second-password".to_string());
        create_initial_admin_user(&store, &config).await.unwrap();

        assert_eq!(store.count_users().await.unwrap(), 1);
        let admin = store.get_user_by_email(&config.admin_email).await.unwrap().unwrap();
        assert!(auth::password::verify_password("second-password", &admin.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_seeding_without_password_is_a_no_op() {
        let config = create_test_config();
        let store = MemoryStore::new();

        create_initial_admin_user(&store, &config).await.unwrap();
        assert_eq!(store.count_users().await.unwrap(), 0);
    }

    #[test]
    fn test_wildcard_origin_with_credentials_is_rejected() {
        let mut config = create_test_config();
        config.auth.security.cors.allowed_origins = vec!["*".to_string()];
        config.auth.security.cors.allow_credentials = true;
        assert!(create_cors_layer(&config).is_err());

        config.auth.security.cors.allow_credentials = false;
        assert!(create_cors_layer(&config).is_ok());
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        use axum::body::Body;
        use tower::ServiceExt;

        let config = create_test_config();
        let state = AppState::builder()
            .db(Arc::new(db::connection_cache(&config.database)))
            .config(config)
            .build();
        let router = build_router(state).unwrap();

        let request = http::Request::builder()
            .method(http::Method::OPTIONS)
            .uri("/api/cars")
            .header(http::header::ORIGIN, "http://localhost:3000")
            .header(http::header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(
            response.headers().get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_unreachable_store_does_not_abort_startup() {
        let mut config = create_test_config();
        config.database.url = "postgres://showroom@127.0.0.1:1/showroom".to_string();
        config.database.acquire_timeout = std::time::Duration::from_millis(200);
        config.admin_password = Some("hunter2hunter2".to_string());

        let app = Application::new(config).await.unwrap();
        let server = app.into_test_server();

        server.get("/healthz").await.assert_status_ok();
        server.get("/readyz").await.assert_status(http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
