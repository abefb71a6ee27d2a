//! Repository traits implemented by every store backend.
//!
//! One trait per collection, combined into [`Store`]. Handlers only ever see a
//! [`StoreHandle`](super::connection::StoreHandle), so the Postgres and in-memory backends are
//! interchangeable.
//!
//! Conventions shared by all backends:
//!
//! - `get_*` returns `Ok(None)` for an unknown id
//! - `update_*` returns `Ok(None)` for an unknown id and bumps `updated_at` otherwise
//! - `delete_*` returns whether a row was removed
//! - `list_*` applies the filter's pagination, `count_*` ignores it

use std::collections::HashMap;

use async_trait::async_trait;

use super::{
    errors::Result,
    models::{
        attributes::{AttributeCreateDBRequest, AttributeDBResponse, AttributeFilter, AttributeUpdateDBRequest},
        cars::{CarCreateDBRequest, CarDBResponse, CarFilter, CarUpdateDBRequest},
        inquiries::{InquiryCreateDBRequest, InquiryDBResponse, InquiryFilter},
        users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
};
use crate::{
    api::models::inquiries::InquiryStatus,
    types::{AttributeId, CarId, InquiryId, UserId},
};

#[async_trait]
pub trait CarStore: Send + Sync {
    async fn create_car(&self, request: &CarCreateDBRequest) -> Result<CarDBResponse>;

    async fn get_car(&self, id: CarId) -> Result<Option<CarDBResponse>>;

    /// Look up many listings at once, keyed by id. Unknown ids are simply absent.
    async fn get_cars(&self, ids: &[CarId]) -> Result<HashMap<CarId, CarDBResponse>>;

    async fn list_cars(&self, filter: &CarFilter) -> Result<Vec<CarDBResponse>>;

    async fn count_cars(&self, filter: &CarFilter) -> Result<i64>;

    async fn update_car(&self, id: CarId, request: &CarUpdateDBRequest) -> Result<Option<CarDBResponse>>;

    async fn delete_car(&self, id: CarId) -> Result<bool>;
}

#[async_trait]
pub trait InquiryStore: Send + Sync {
    /// Stores the inquiry with status `new`. `car_id` is not checked.
    async fn create_inquiry(&self, request: &InquiryCreateDBRequest) -> Result<InquiryDBResponse>;

    async fn get_inquiry(&self, id: InquiryId) -> Result<Option<InquiryDBResponse>>;

    /// Newest first
    async fn list_inquiries(&self, filter: &InquiryFilter) -> Result<Vec<InquiryDBResponse>>;

    async fn count_inquiries(&self, filter: &InquiryFilter) -> Result<i64>;

    async fn update_inquiry_status(&self, id: InquiryId, status: InquiryStatus) -> Result<Option<InquiryDBResponse>>;

    async fn delete_inquiry(&self, id: InquiryId) -> Result<bool>;
}

#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Fails with `UniqueViolation` when the kind already has this value.
    async fn create_attribute(&self, request: &AttributeCreateDBRequest) -> Result<AttributeDBResponse>;

    async fn get_attribute(&self, id: AttributeId) -> Result<Option<AttributeDBResponse>>;

    /// Ordered by kind, then `sort_order`, then value
    async fn list_attributes(&self, filter: &AttributeFilter) -> Result<Vec<AttributeDBResponse>>;

    async fn update_attribute(&self, id: AttributeId, request: &AttributeUpdateDBRequest) -> Result<Option<AttributeDBResponse>>;

    async fn delete_attribute(&self, id: AttributeId) -> Result<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `UniqueViolation` when the email (case-insensitive) is taken.
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse>;

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>>;

    /// Case-insensitive
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>>;

    /// Oldest first
    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<UserDBResponse>>;

    async fn count_users(&self) -> Result<i64>;

    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<Option<UserDBResponse>>;

    async fn delete_user(&self, id: UserId) -> Result<bool>;

    /// Stamp `last_login` with the current time
    async fn record_login(&self, id: UserId) -> Result<()>;
}

/// A connected store: every collection plus a liveness check.
#[async_trait]
pub trait Store: CarStore + InquiryStore + AttributeStore + UserStore + std::fmt::Debug {
    /// Cheap round trip proving the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}
