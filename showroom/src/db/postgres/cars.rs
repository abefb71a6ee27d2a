use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use super::{PgStore, like_pattern};
use crate::{
    api::models::cars::CarSort,
    db::{
        errors::Result,
        models::cars::{CarCreateDBRequest, CarDBResponse, CarFilter, CarUpdateDBRequest},
        store::CarStore,
    },
    types::{CarId, abbrev_uuid},
};

#[derive(Debug, FromRow)]
struct Car {
    id: CarId,
    make: String,
    model: String,
    year: i32,
    price: Decimal,
    mileage: i32,
    fuel_type: Option<String>,
    transmission: Option<String>,
    body_type: Option<String>,
    color: Option<String>,
    description: Option<String>,
    features: Vec<String>,
    images: Vec<String>,
    is_featured: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Car> for CarDBResponse {
    fn from(car: Car) -> Self {
        Self {
            id: car.id,
            make: car.make,
            model: car.model,
            year: car.year,
            price: car.price,
            mileage: car.mileage,
            fuel_type: car.fuel_type,
            transmission: car.transmission,
            body_type: car.body_type,
            color: car.color,
            description: car.description,
            features: car.features,
            images: car.images,
            is_featured: car.is_featured,
            is_active: car.is_active,
            created_at: car.created_at,
            updated_at: car.updated_at,
        }
    }
}

const COLUMNS: &str = "id, make, model, year, price, mileage, fuel_type, transmission, body_type, color, \
                       description, features, images, is_featured, is_active, created_at, updated_at";

fn order_by(sort: CarSort) -> &'static str {
    match sort {
        CarSort::Newest => " ORDER BY created_at DESC, id",
        CarSort::PriceAsc => " ORDER BY price ASC, created_at DESC, id",
        CarSort::PriceDesc => " ORDER BY price DESC, created_at DESC, id",
        CarSort::YearDesc => " ORDER BY year DESC, created_at DESC, id",
        CarSort::MileageAsc => " ORDER BY mileage ASC, created_at DESC, id",
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &CarFilter) {
    query.push(" WHERE TRUE");

    if filter.active_only {
        query.push(" AND is_active");
    }
    if let Some(featured) = filter.featured {
        query.push(" AND is_featured = ").push_bind(featured);
    }

    let text_filters = [
        ("make", &filter.make),
        ("model", &filter.model),
        ("body_type", &filter.body_type),
        ("fuel_type", &filter.fuel_type),
        ("transmission", &filter.transmission),
    ];
    for (column, value) in text_filters {
        if let Some(value) = value {
            query.push(format!(" AND LOWER({column}) = LOWER(")).push_bind(value.clone()).push(")");
        }
    }

    if let Some(min_price) = filter.min_price {
        query.push(" AND price >= ").push_bind(min_price);
    }
    if let Some(max_price) = filter.max_price {
        query.push(" AND price <= ").push_bind(max_price);
    }
    if let Some(min_year) = filter.min_year {
        query.push(" AND year >= ").push_bind(min_year);
    }
    if let Some(max_year) = filter.max_year {
        query.push(" AND year <= ").push_bind(max_year);
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        query
            .push(" AND (make ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR model ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl CarStore for PgStore {
    #[instrument(skip(self, request), fields(make = %request.make, model = %request.model), err)]
    async fn create_car(&self, request: &CarCreateDBRequest) -> Result<CarDBResponse> {
        let car = sqlx::query_as::<_, Car>(&format!(
            "INSERT INTO cars (id, make, model, year, price, mileage, fuel_type, transmission, body_type, color, \
             description, features, images, is_featured, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&request.make)
        .bind(&request.model)
        .bind(request.year)
        .bind(request.price)
        .bind(request.mileage)
        .bind(&request.fuel_type)
        .bind(&request.transmission)
        .bind(&request.body_type)
        .bind(&request.color)
        .bind(&request.description)
        .bind(&request.features)
        .bind(&request.images)
        .bind(request.is_featured)
        .bind(request.is_active)
        .fetch_one(self.pool())
        .await?;

        Ok(car.into())
    }

    #[instrument(skip(self), fields(car_id = %abbrev_uuid(&id)), err)]
    async fn get_car(&self, id: CarId) -> Result<Option<CarDBResponse>> {
        let car = sqlx::query_as::<_, Car>(&format!("SELECT {COLUMNS} FROM cars WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(car.map(Into::into))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_cars(&self, ids: &[CarId]) -> Result<HashMap<CarId, CarDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let cars = sqlx::query_as::<_, Car>(&format!("SELECT {COLUMNS} FROM cars WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(self.pool())
            .await?;

        Ok(cars.into_iter().map(|car| (car.id, car.into())).collect())
    }

    #[instrument(skip(self, filter), fields(skip = filter.skip, limit = filter.limit), err)]
    async fn list_cars(&self, filter: &CarFilter) -> Result<Vec<CarDBResponse>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM cars"));
        push_filter(&mut query, filter);
        query.push(order_by(filter.sort));
        query.push(" LIMIT ").push_bind(filter.limit).push(" OFFSET ").push_bind(filter.skip);

        let cars = query.build_query_as::<Car>().fetch_all(self.pool()).await?;
        Ok(cars.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count_cars(&self, filter: &CarFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM cars");
        push_filter(&mut query, filter);

        Ok(query.build_query_scalar::<i64>().fetch_one(self.pool()).await?)
    }

    #[instrument(skip(self, request), fields(car_id = %abbrev_uuid(&id)), err)]
    async fn update_car(&self, id: CarId, request: &CarUpdateDBRequest) -> Result<Option<CarDBResponse>> {
        let car = sqlx::query_as::<_, Car>(&format!(
            "UPDATE cars SET \
                make = COALESCE($2, make), \
                model = COALESCE($3, model), \
                year = COALESCE($4, year), \
                price = COALESCE($5, price), \
                mileage = COALESCE($6, mileage), \
                fuel_type = COALESCE($7, fuel_type), \
                transmission = COALESCE($8, transmission), \
                body_type = COALESCE($9, body_type), \
                color = COALESCE($10, color), \
                description = COALESCE($11, description), \
                features = COALESCE($12, features), \
                images = COALESCE($13, images), \
                is_featured = COALESCE($14, is_featured), \
                is_active = COALESCE($15, is_active), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&request.make)
        .bind(&request.model)
        .bind(request.year)
        .bind(request.price)
        .bind(request.mileage)
        .bind(&request.fuel_type)
        .bind(&request.transmission)
        .bind(&request.body_type)
        .bind(&request.color)
        .bind(&request.description)
        .bind(&request.features)
        .bind(&request.images)
        .bind(request.is_featured)
        .bind(request.is_active)
        .fetch_optional(self.pool())
        .await?;

        Ok(car.map(Into::into))
    }

    #[instrument(skip(self), fields(car_id = %abbrev_uuid(&id)), err)]
    async fn delete_car(&self, id: CarId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cars WHERE id = $1").bind(id).execute(self.pool()).await?;
        Ok(result.rows_affected() > 0)
    }
}
