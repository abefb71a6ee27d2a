//! In-memory store backend, selected with a `memory://` database URL.
//!
//! Used for local development without Postgres and by the handler tests. State lives for as long
//! as the [`MemoryStore`] does, which in practice is the process lifetime because the connection
//! cache keeps the handle.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

use super::{
    connection::{Connector, StoreHandle},
    errors::{DbError, Result},
    models::{
        attributes::{AttributeCreateDBRequest, AttributeDBResponse, AttributeFilter, AttributeUpdateDBRequest},
        cars::{CarCreateDBRequest, CarDBResponse, CarFilter, CarUpdateDBRequest},
        inquiries::{InquiryCreateDBRequest, InquiryDBResponse, InquiryFilter},
        users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
    store::{AttributeStore, CarStore, InquiryStore, Store, UserStore},
};
use crate::{
    api::models::{attributes::AttributeKind, cars::CarSort, inquiries::InquiryStatus},
    config::MEMORY_SCHEME,
    types::{AttributeId, CarId, InquiryId, UserId},
};

/// Store backed by concurrent hash maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cars: DashMap<CarId, CarDBResponse>,
    inquiries: DashMap<InquiryId, InquiryDBResponse>,
    attributes: DashMap<AttributeId, AttributeDBResponse>,
    /// (kind, value) -> id, enforces uniqueness per kind
    attribute_values: DashMap<(AttributeKind, String), AttributeId>,
    users: DashMap<UserId, UserDBResponse>,
    /// lowercased email -> id
    user_emails: DashMap<String, UserId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn unique_violation(table: &str, constraint: &str) -> DbError {
    DbError::UniqueViolation {
        constraint: Some(constraint.to_string()),
        table: Some(table.to_string()),
        message: format!("duplicate key value violates unique constraint \"{constraint}\""),
    }
}

fn page<T>(items: Vec<T>, skip: i64, limit: i64) -> Vec<T> {
    items.into_iter().skip(skip.max(0) as usize).take(limit.max(0) as usize).collect()
}

fn compare_cars(a: &CarDBResponse, b: &CarDBResponse, sort: CarSort) -> Ordering {
    let primary = match sort {
        CarSort::Newest => Ordering::Equal,
        CarSort::PriceAsc => a.price.cmp(&b.price),
        CarSort::PriceDesc => b.price.cmp(&a.price),
        CarSort::YearDesc => b.year.cmp(&a.year),
        CarSort::MileageAsc => a.mileage.cmp(&b.mileage),
    };
    primary.then_with(|| b.created_at.cmp(&a.created_at)).then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl CarStore for MemoryStore {
    async fn create_car(&self, request: &CarCreateDBRequest) -> Result<CarDBResponse> {
        let now = Utc::now();
        let car = CarDBResponse {
            id: Uuid::new_v4(),
            make: request.make.clone(),
            model: request.model.clone(),
            year: request.year,
            price: request.price,
            mileage: request.mileage,
            fuel_type: request.fuel_type.clone(),
            transmission: request.transmission.clone(),
            body_type: request.body_type.clone(),
            color: request.color.clone(),
            description: request.description.clone(),
            features: request.features.clone(),
            images: request.images.clone(),
            is_featured: request.is_featured,
            is_active: request.is_active,
            created_at: now,
            updated_at: now,
        };
        self.cars.insert(car.id, car.clone());
        Ok(car)
    }

    async fn get_car(&self, id: CarId) -> Result<Option<CarDBResponse>> {
        Ok(self.cars.get(&id).map(|car| car.clone()))
    }

    async fn get_cars(&self, ids: &[CarId]) -> Result<HashMap<CarId, CarDBResponse>> {
        Ok(ids.iter().filter_map(|id| self.cars.get(id).map(|car| (*id, car.clone()))).collect())
    }

    async fn list_cars(&self, filter: &CarFilter) -> Result<Vec<CarDBResponse>> {
        let mut cars: Vec<_> = self.cars.iter().filter(|car| filter.matches(car)).map(|car| car.clone()).collect();
        cars.sort_by(|a, b| compare_cars(a, b, filter.sort));
        Ok(page(cars, filter.skip, filter.limit))
    }

    async fn count_cars(&self, filter: &CarFilter) -> Result<i64> {
        Ok(self.cars.iter().filter(|car| filter.matches(car)).count() as i64)
    }

    async fn update_car(&self, id: CarId, request: &CarUpdateDBRequest) -> Result<Option<CarDBResponse>> {
        let Some(mut car) = self.cars.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(make) = &request.make {
            car.make = make.clone();
        }
        if let Some(model) = &request.model {
            car.model = model.clone();
        }
        if let Some(year) = request.year {
            car.year = year;
        }
        if let Some(price) = request.price {
            car.price = price;
        }
        if let Some(mileage) = request.mileage {
            car.mileage = mileage;
        }
        if let Some(fuel_type) = &request.fuel_type {
            car.fuel_type = Some(fuel_type.clone());
        }
        if let Some(transmission) = &request.transmission {
            car.transmission = Some(transmission.clone());
        }
        if let Some(body_type) = &request.body_type {
            car.body_type = Some(body_type.clone());
        }
        if let Some(color) = &request.color {
            car.color = Some(color.clone());
        }
        if let Some(description) = &request.description {
            car.description = Some(description.clone());
        }
        if let Some(features) = &request.features {
            car.features = features.clone();
        }
        if let Some(images) = &request.images {
            car.images = images.clone();
        }
        if let Some(is_featured) = request.is_featured {
            car.is_featured = is_featured;
        }
        if let Some(is_active) = request.is_active {
            car.is_active = is_active;
        }
        car.updated_at = Utc::now();

        Ok(Some(car.clone()))
    }

    async fn delete_car(&self, id: CarId) -> Result<bool> {
        Ok(self.cars.remove(&id).is_some())
    }
}

#[async_trait]
impl InquiryStore for MemoryStore {
    async fn create_inquiry(&self, request: &InquiryCreateDBRequest) -> Result<InquiryDBResponse> {
        let now = Utc::now();
        let inquiry = InquiryDBResponse {
            id: Uuid::new_v4(),
            car_id: request.car_id,
            name: request.name.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            message: request.message.clone(),
            status: InquiryStatus::New,
            created_at: now,
            updated_at: now,
        };
        self.inquiries.insert(inquiry.id, inquiry.clone());
        Ok(inquiry)
    }

    async fn get_inquiry(&self, id: InquiryId) -> Result<Option<InquiryDBResponse>> {
        Ok(self.inquiries.get(&id).map(|inquiry| inquiry.clone()))
    }

    async fn list_inquiries(&self, filter: &InquiryFilter) -> Result<Vec<InquiryDBResponse>> {
        let mut inquiries: Vec<_> = self
            .inquiries
            .iter()
            .filter(|inquiry| filter.matches(inquiry))
            .map(|inquiry| inquiry.clone())
            .collect();
        inquiries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(page(inquiries, filter.skip, filter.limit))
    }

    async fn count_inquiries(&self, filter: &InquiryFilter) -> Result<i64> {
        Ok(self.inquiries.iter().filter(|inquiry| filter.matches(inquiry)).count() as i64)
    }

    async fn update_inquiry_status(&self, id: InquiryId, status: InquiryStatus) -> Result<Option<InquiryDBResponse>> {
        Ok(self.inquiries.get_mut(&id).map(|mut inquiry| {
            inquiry.status = status;
            inquiry.updated_at = Utc::now();
            inquiry.clone()
        }))
    }

    async fn delete_inquiry(&self, id: InquiryId) -> Result<bool> {
        Ok(self.inquiries.remove(&id).is_some())
    }
}

#[async_trait]
impl AttributeStore for MemoryStore {
    async fn create_attribute(&self, request: &AttributeCreateDBRequest) -> Result<AttributeDBResponse> {
        let Entry::Vacant(slot) = self.attribute_values.entry((request.kind, request.value.clone())) else {
            return Err(unique_violation("car_attributes", "car_attributes_kind_value_unique"));
        };

        let now = Utc::now();
        let attribute = AttributeDBResponse {
            id: Uuid::new_v4(),
            kind: request.kind,
            value: request.value.clone(),
            sort_order: request.sort_order,
            is_active: request.is_active,
            created_at: now,
            updated_at: now,
        };
        self.attributes.insert(attribute.id, attribute.clone());
        slot.insert(attribute.id);
        Ok(attribute)
    }

    async fn get_attribute(&self, id: AttributeId) -> Result<Option<AttributeDBResponse>> {
        Ok(self.attributes.get(&id).map(|attribute| attribute.clone()))
    }

    async fn list_attributes(&self, filter: &AttributeFilter) -> Result<Vec<AttributeDBResponse>> {
        let mut attributes: Vec<_> = self
            .attributes
            .iter()
            .filter(|attribute| filter.matches(attribute))
            .map(|attribute| attribute.clone())
            .collect();
        attributes.sort_by(|a, b| {
            a.kind
                .as_str()
                .cmp(b.kind.as_str())
                .then_with(|| a.sort_order.cmp(&b.sort_order))
                .then_with(|| a.value.cmp(&b.value))
        });
        Ok(attributes)
    }

    // Lock order is `attribute_values` then `attributes`; never hold an `attributes` guard while
    // touching the index.
    async fn update_attribute(&self, id: AttributeId, request: &AttributeUpdateDBRequest) -> Result<Option<AttributeDBResponse>> {
        loop {
            let Some((kind, current)) = self.attributes.get(&id).map(|attribute| (attribute.kind, attribute.value.clone())) else {
                return Ok(None);
            };

            let renamed = request.value.as_ref().filter(|value| **value != current);
            if let Some(value) = renamed {
                match self.attribute_values.entry((kind, value.clone())) {
                    Entry::Occupied(_) => return Err(unique_violation("car_attributes", "car_attributes_kind_value_unique")),
                    Entry::Vacant(slot) => {
                        slot.insert(id);
                    }
                }
            }

            let updated = self.attributes.get_mut(&id).and_then(|mut attribute| {
                // Renamed or deleted by someone else since the read above
                if attribute.value != current {
                    return None;
                }
                if let Some(value) = renamed {
                    attribute.value = value.clone();
                }
                if let Some(sort_order) = request.sort_order {
                    attribute.sort_order = sort_order;
                }
                if let Some(is_active) = request.is_active {
                    attribute.is_active = is_active;
                }
                attribute.updated_at = Utc::now();
                Some(attribute.clone())
            });

            match updated {
                Some(attribute) => {
                    if renamed.is_some() {
                        self.attribute_values.remove_if(&(kind, current), |_, owner| *owner == id);
                    }
                    return Ok(Some(attribute));
                }
                None => {
                    if let Some(value) = renamed {
                        self.attribute_values.remove_if(&(kind, value.clone()), |_, owner| *owner == id);
                    }
                }
            }
        }
    }

    async fn delete_attribute(&self, id: AttributeId) -> Result<bool> {
        match self.attributes.remove(&id) {
            Some((_, attribute)) => {
                self.attribute_values.remove(&(attribute.kind, attribute.value));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let email = request.email.to_lowercase();
        let Entry::Vacant(slot) = self.user_emails.entry(email.clone()) else {
            return Err(unique_violation("users", "users_email_unique"));
        };

        let now = Utc::now();
        let user = UserDBResponse {
            id: Uuid::new_v4(),
            email,
            name: request.name.clone(),
            role: request.role,
            password_hash: request.password_hash.clone(),
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        self.users.insert(user.id, user.clone());
        slot.insert(user.id);
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let Some(id) = self.user_emails.get(&email.to_lowercase()).map(|id| *id) else {
            return Ok(None);
        };
        self.get_user(id).await
    }

    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<UserDBResponse>> {
        let mut users: Vec<_> = self.users.iter().map(|user| user.clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.email.cmp(&b.email)));
        Ok(page(users, skip, limit))
    }

    async fn count_users(&self) -> Result<i64> {
        Ok(self.users.len() as i64)
    }

    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<Option<UserDBResponse>> {
        Ok(self.users.get_mut(&id).map(|mut user| {
            if let Some(name) = &request.name {
                user.name = name.clone();
            }
            if let Some(role) = request.role {
                user.role = role;
            }
            if let Some(password_hash) = &request.password_hash {
                user.password_hash = password_hash.clone();
            }
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        match self.users.remove(&id) {
            Some((_, user)) => {
                self.user_emails.remove(&user.email);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_login(&self, id: UserId) -> Result<()> {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Connector for `memory://` URLs. Every connect yields a fresh, empty store.
#[derive(Debug, Default)]
pub struct MemoryConnector;

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, uri: &str) -> Result<StoreHandle> {
        if !uri.starts_with(MEMORY_SCHEME) {
            return Err(DbError::Other(anyhow::anyhow!("not an in-memory store URL")));
        }
        Ok(Arc::new(MemoryStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions::Role;
    use rust_decimal::Decimal;

    fn car(make: &str, price: i64, year: i32) -> CarCreateDBRequest {
        CarCreateDBRequest {
            make: make.to_string(),
            model: "Model".to_string(),
            year,
            price: Decimal::new(price, 0),
            mileage: 10_000,
            fuel_type: None,
            transmission: None,
            body_type: None,
            color: None,
            description: None,
            features: vec![],
            images: vec![],
            is_featured: false,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_list_cars_sorts_and_paginates() {
        let store = MemoryStore::new();
        for (make, price, year) in [("Audi", 30_000, 2018), ("BMW", 10_000, 2021), ("Citroen", 20_000, 2015)] {
            store.create_car(&car(make, price, year)).await.unwrap();
        }

        let mut filter = CarFilter::new(0, 10);
        filter.sort = CarSort::PriceAsc;
        let makes: Vec<_> = store.list_cars(&filter).await.unwrap().into_iter().map(|c| c.make).collect();
        assert_eq!(makes, ["BMW", "Citroen", "Audi"]);

        filter.sort = CarSort::YearDesc;
        filter.skip = 1;
        filter.limit = 1;
        let makes: Vec<_> = store.list_cars(&filter).await.unwrap().into_iter().map(|c| c.make).collect();
        assert_eq!(makes, ["Audi"]);
        assert_eq!(store.count_cars(&filter).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_unknown_car_is_none() {
        let store = MemoryStore::new();
        let result = store.update_car(Uuid::new_v4(), &CarUpdateDBRequest::featured(true)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_get_cars_skips_unknown_ids() {
        let store = MemoryStore::new();
        let known = store.create_car(&car("Audi", 1, 2020)).await.unwrap();
        let found = store.get_cars(&[known.id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&known.id));
    }

    #[tokio::test]
    async fn test_user_email_is_unique_case_insensitively() {
        let store = MemoryStore::new();
        let request = UserCreateDBRequest {
            email: "Admin@Example.org".to_string(),
            name: "Admin".to_string(),
            role: Role::Admin,
            password_hash: "hash".to_string(),
        };
        let user = store.create_user(&request).await.unwrap();
        assert_eq!(user.email, "admin@example.org");

        let duplicate = UserCreateDBRequest {
            email: "ADMIN@example.org".to_string(),
            ..request
        };
        assert!(matches!(store.create_user(&duplicate).await, Err(DbError::UniqueViolation { .. })));

        let found = store.get_user_by_email("admin@EXAMPLE.org").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);

        assert!(store.delete_user(user.id).await.unwrap());
        assert!(store.create_user(&duplicate).await.is_ok(), "email is free again after delete");
    }

    #[tokio::test]
    async fn test_attribute_value_unique_per_kind() {
        let store = MemoryStore::new();
        let red = AttributeCreateDBRequest {
            kind: AttributeKind::Color,
            value: "Red".to_string(),
            sort_order: 0,
            is_active: true,
        };
        store.create_attribute(&red).await.unwrap();
        assert!(store.create_attribute(&red).await.is_err());

        let blue = store
            .create_attribute(&AttributeCreateDBRequest {
                value: "Blue".to_string(),
                ..red.clone()
            })
            .await
            .unwrap();
        let rename = AttributeUpdateDBRequest {
            value: Some("Red".to_string()),
            ..Default::default()
        };
        assert!(store.update_attribute(blue.id, &rename).await.is_err());

        let other_kind = AttributeCreateDBRequest {
            kind: AttributeKind::Make,
            ..red
        };
        assert!(store.create_attribute(&other_kind).await.is_ok());
    }

    #[test]
    fn test_concurrent_attribute_create_and_rename_finish() {
        use futures::executor::block_on;
        use std::{sync::mpsc, thread, time::Duration};

        let store = Arc::new(MemoryStore::new());
        let seeded: Vec<AttributeId> = block_on(async {
            let mut ids = Vec::new();
            for i in 0..4 {
                let request = AttributeCreateDBRequest {
                    kind: AttributeKind::Make,
                    value: format!("seed-{i}"),
                    sort_order: i,
                    is_active: true,
                };
                ids.push(store.create_attribute(&request).await.unwrap().id);
            }
            ids
        });

        let (done, finished) = mpsc::channel();
        for worker in 0..8 {
            let store = store.clone();
            let seeded = seeded.clone();
            let done = done.clone();
            thread::spawn(move || {
                block_on(async {
                    for i in 0..2_000 {
                        if worker % 2 == 0 {
                            let request = AttributeCreateDBRequest {
                                kind: AttributeKind::Make,
                                value: format!("w{worker}-{i}"),
                                sort_order: 0,
                                is_active: true,
                            };
                            let _ = store.create_attribute(&request).await;
                        } else {
                            let rename = AttributeUpdateDBRequest {
                                value: Some(format!("w{worker}-{}", i % 7)),
                                ..Default::default()
                            };
                            let _ = store.update_attribute(seeded[i % seeded.len()], &rename).await;
                        }
                    }
                });
                let _ = done.send(worker);
            });
        }
        drop(done);

        for _ in 0..8 {
            finished
                .recv_timeout(Duration::from_secs(30))
                .expect("attribute writers did not finish");
        }

        // The (kind, value) index still matches the stored attributes exactly
        let attributes = block_on(store.list_attributes(&AttributeFilter::default())).unwrap();
        assert_eq!(store.attribute_values.len(), attributes.len());
        for attribute in &attributes {
            let owner = store.attribute_values.get(&(attribute.kind, attribute.value.clone())).map(|id| *id);
            assert_eq!(owner, Some(attribute.id));
        }
    }

    #[tokio::test]
    async fn test_memory_connector_rejects_other_schemes() {
        assert!(MemoryConnector.connect("postgres://localhost/db").await.is_err());
        let store = MemoryConnector.connect("memory://").await.unwrap();
        assert_eq!(store.backend(), "memory");
    }
}
