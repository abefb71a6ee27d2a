//! Test utilities: in-memory app, accounts and session cookies.

use axum::http::{HeaderName, header};
use axum_test::TestServer;
use uuid::Uuid;

use crate::{
    AppState, Application,
    auth::{
        password::{self, Argon2Params},
        permissions::Role,
        principal::Principal,
        session,
    },
    config::{Config, MEMORY_SCHEME, PasswordConfig},
    db::{
        connection::{ConnectionProvider, StoreHandle},
        models::{
            cars::{CarCreateDBRequest, CarDBResponse},
            users::{UserCreateDBRequest, UserDBResponse},
        },
        store::{CarStore, UserStore},
    },
};

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        ..Default::default()
    };
    config.database.url = MEMORY_SCHEME.to_string();
    config.auth.session.cookie_secure = false;
    // Cheap hashing, tests hash a lot of passwords
    config.auth.password = PasswordConfig {
        argon2_memory_kib: 1024,
        argon2_iterations: 1,
        argon2_parallelism: 1,
        ..Default::default()
    };
    config
}

/// A principal that exists only in a token, with no backing account.
pub fn test_principal(role: Role) -> Principal {
    let id = Uuid::new_v4();
    Principal {
        id,
        email: format!("{}-{}@test.com", role, id.simple()),
        name: format!("Test {role}"),
        role,
    }
}

/// Test server over the in-memory backend, plus its state for direct store access.
pub async fn create_test_app() -> (TestServer, AppState) {
    create_test_app_with_config(create_test_config()).await
}

pub async fn create_test_app_with_config(config: Config) -> (TestServer, AppState) {
    let app = Application::new(config).await.expect("Failed to create application");
    let state = app.state().clone();
    (app.into_test_server(), state)
}

pub async fn test_store(state: &AppState) -> StoreHandle {
    state.db.connection().await.expect("in-memory store should always connect")
}

/// `Cookie` header carrying a session for `principal`.
pub fn session_header(principal: &Principal, config: &Config) -> (HeaderName, String) {
    let token = session::create_session_token(principal, config).expect("Failed to sign test token");
    (header::COOKIE, format!("{}={}", config.auth.session.cookie_name, token))
}

/// `Cookie` header for a fresh principal with `role`.
pub fn role_header(role: Role, config: &Config) -> (HeaderName, String) {
    session_header(&test_principal(role), config)
}

pub async fn create_test_user(state: &AppState, role: Role, plain_password: &str) -> UserDBResponse {
    let hash = password::hash_password(plain_password, Argon2Params::from(&state.config.auth.password)).expect("Failed to hash password");
    test_store(state)
        .await
        .create_user(&UserCreateDBRequest {
            email: format!("{}-{}@test.com", role, Uuid::new_v4().simple()),
            name: format!("Test {role}"),
            role,
            password_hash: hash,
        })
        .await
        .expect("Failed to create test user")
}

pub fn principal_for(user: &UserDBResponse) -> Principal {
    Principal {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
    }
}

pub fn car_request(make: &str, model: &str) -> CarCreateDBRequest {
    CarCreateDBRequest {
        make: make.to_string(),
        model: model.to_string(),
        year: 2021,
        price: rust_decimal::Decimal::new(1_850_000, 2),
        mileage: 42_000,
        fuel_type: Some("petrol".to_string()),
        transmission: Some("manual".to_string()),
        body_type: Some("hatchback".to_string()),
        color: Some("blue".to_string()),
        description: Some(format!("Well kept {make} {model}")),
        features: vec!["air conditioning".to_string()],
        images: vec![],
        is_featured: false,
        is_active: true,
    }
}

pub async fn create_test_car(state: &AppState, request: CarCreateDBRequest) -> CarDBResponse {
    test_store(state).await.create_car(&request).await.expect("Failed to create test car")
}
