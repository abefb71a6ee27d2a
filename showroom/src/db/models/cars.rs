//! Store models for vehicle listings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{api::models::cars::CarSort, types::CarId};

/// Store request for creating a listing
#[derive(Debug, Clone)]
pub struct CarCreateDBRequest {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: Decimal,
    pub mileage: i32,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub body_type: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub is_featured: bool,
    pub is_active: bool,
}

/// Store request for a partial update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct CarUpdateDBRequest {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<Decimal>,
    pub mileage: Option<i32>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub body_type: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub features: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
}

impl CarUpdateDBRequest {
    pub fn featured(is_featured: bool) -> Self {
        Self {
            is_featured: Some(is_featured),
            ..Default::default()
        }
    }

    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Default::default()
        }
    }
}

/// Store response for a listing
#[derive(Debug, Clone, PartialEq)]
pub struct CarDBResponse {
    pub id: CarId,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: Decimal,
    pub mileage: i32,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub body_type: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for listing queries. Text filters compare case-insensitively.
#[derive(Debug, Clone)]
pub struct CarFilter {
    pub skip: i64,
    pub limit: i64,
    /// Hide inactive listings (public endpoints)
    pub active_only: bool,
    pub make: Option<String>,
    pub model: Option<String>,
    pub body_type: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub featured: Option<bool>,
    /// Substring match on make, model and description
    pub search: Option<String>,
    pub sort: CarSort,
}

impl CarFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            active_only: false,
            make: None,
            model: None,
            body_type: None,
            fuel_type: None,
            transmission: None,
            min_price: None,
            max_price: None,
            min_year: None,
            max_year: None,
            featured: None,
            search: None,
            sort: CarSort::default(),
        }
    }

    pub fn active_only(mut self) -> Self {
        self.active_only = true;
        self
    }

    /// Whether `car` passes every predicate of this filter. Pagination and sort are not applied.
    pub fn matches(&self, car: &CarDBResponse) -> bool {
        fn same(expected: &Option<String>, actual: Option<&str>) -> bool {
            match expected {
                Some(expected) => actual.is_some_and(|actual| actual.eq_ignore_ascii_case(expected)),
                None => true,
            }
        }

        if self.active_only && !car.is_active {
            return false;
        }
        if self.featured.is_some_and(|featured| featured != car.is_featured) {
            return false;
        }
        if !same(&self.make, Some(&car.make))
            || !same(&self.model, Some(&car.model))
            || !same(&self.body_type, car.body_type.as_deref())
            || !same(&self.fuel_type, car.fuel_type.as_deref())
            || !same(&self.transmission, car.transmission.as_deref())
        {
            return false;
        }
        if self.min_price.is_some_and(|min| car.price < min) || self.max_price.is_some_and(|max| car.price > max) {
            return false;
        }
        if self.min_year.is_some_and(|min| car.year < min) || self.max_year.is_some_and(|max| car.year > max) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let haystacks = [Some(car.make.as_str()), Some(car.model.as_str()), car.description.as_deref()];
            if !haystacks.into_iter().flatten().any(|h| h.to_lowercase().contains(&needle)) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn car() -> CarDBResponse {
        let now = Utc::now();
        CarDBResponse {
            id: Uuid::new_v4(),
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2019,
            price: Decimal::new(15_000, 0),
            mileage: 60_000,
            fuel_type: Some("petrol".to_string()),
            transmission: Some("manual".to_string()),
            body_type: None,
            color: None,
            description: Some("One owner, full service history".to_string()),
            features: vec![],
            images: vec![],
            is_featured: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_filter_matches() {
        let car = car();
        let all = CarFilter::new(0, 10);
        assert!(all.matches(&car));

        let make = CarFilter {
            make: Some("toyota".to_string()),
            ..all.clone()
        };
        assert!(make.matches(&car));

        let body = CarFilter {
            body_type: Some("suv".to_string()),
            ..all.clone()
        };
        assert!(!body.matches(&car), "missing body type never matches a body type filter");

        let price = CarFilter {
            min_price: Some(Decimal::new(15_000, 0)),
            max_price: Some(Decimal::new(15_000, 0)),
            ..all.clone()
        };
        assert!(price.matches(&car), "price bounds are inclusive");

        let search = CarFilter {
            search: Some("SERVICE".to_string()),
            ..all.clone()
        };
        assert!(search.matches(&car));

        let featured = CarFilter {
            featured: Some(true),
            ..all
        };
        assert!(!featured.matches(&car));
    }

    #[test]
    fn test_active_only_hides_inactive() {
        let mut car = car();
        car.is_active = false;
        assert!(CarFilter::new(0, 10).matches(&car));
        assert!(!CarFilter::new(0, 10).active_only().matches(&car));
    }
}
