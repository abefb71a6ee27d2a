//! API request/response models for vehicle listings.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

use super::pagination::Pagination;
use crate::{
    db::models::cars::{CarCreateDBRequest, CarDBResponse, CarUpdateDBRequest},
    errors::Error,
    types::CarId,
};

/// Oldest model year accepted for a listing.
pub const MIN_YEAR: i32 = 1900;

/// Sort order for listing queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CarSort {
    /// Most recently created first
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    YearDesc,
    MileageAsc,
}

impl std::str::FromStr for CarSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(CarSort::Newest),
            "price_asc" => Ok(CarSort::PriceAsc),
            "price_desc" => Ok(CarSort::PriceDesc),
            "year_desc" => Ok(CarSort::YearDesc),
            "mileage_asc" => Ok(CarSort::MileageAsc),
            other => Err(format!("unknown sort '{other}'")),
        }
    }
}

impl std::fmt::Display for CarSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CarSort::Newest => "newest",
            CarSort::PriceAsc => "price_asc",
            CarSort::PriceDesc => "price_desc",
            CarSort::YearDesc => "year_desc",
            CarSort::MileageAsc => "mileage_asc",
        };
        f.write_str(s)
    }
}

/// Body of `POST /api/admin/cars`. Required fields are optional here so that a missing field
/// is reported through the error envelope instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CarCreate {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub mileage: Option<i32>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub body_type: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
}

/// Body of `PATCH /api/admin/cars/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CarUpdate {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    #[schema(value_type = Option<f64>)]
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

/// Body of `PATCH /api/admin/cars/{id}/featured`. Without a value the flag is flipped.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct FeaturedToggle {
    pub is_featured: Option<bool>,
}

/// Body of `PATCH /api/admin/cars/{id}/active`. Without a value the flag is flipped.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ActiveToggle {
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CarId,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[schema(value_type = f64)]
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

/// Short form of a listing, embedded in inquiries.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarSummary {
    #[schema(value_type = String, format = "uuid")]
    pub id: CarId,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[schema(value_type = f64)]
    pub price: Decimal,
}

/// Query parameters for the listing endpoints.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListCarsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Exact make, case-insensitive
    pub make: Option<String>,
    /// Exact model, case-insensitive
    pub model: Option<String>,
    pub body_type: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[param(value_type = Option<f64>)]
    pub min_price: Option<Decimal>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[param(value_type = Option<f64>)]
    pub max_price: Option<Decimal>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub min_year: Option<i32>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub max_year: Option<i32>,
    /// Only featured (true) or only non-featured (false) listings
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub featured: Option<bool>,
    /// Free-text search over make, model and description
    pub search: Option<String>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[param(value_type = Option<CarSort>)]
    pub sort: Option<CarSort>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values.into_iter().map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect()
}

pub(crate) fn validate_year(year: i32) -> Result<i32, Error> {
    let max_year = Utc::now().year() + 1;
    if !(MIN_YEAR..=max_year).contains(&year) {
        return Err(Error::bad_request(format!("Year must be between {MIN_YEAR} and {max_year}")));
    }
    Ok(year)
}

pub(crate) fn validate_price(price: Decimal) -> Result<Decimal, Error> {
    if price < Decimal::ZERO {
        return Err(Error::bad_request("Price cannot be negative"));
    }
    Ok(price.round_dp(2))
}

pub(crate) fn validate_mileage(mileage: i32) -> Result<i32, Error> {
    if mileage < 0 {
        return Err(Error::bad_request("Mileage cannot be negative"));
    }
    Ok(mileage)
}

impl TryFrom<CarCreate> for CarCreateDBRequest {
    type Error = Error;

    fn try_from(body: CarCreate) -> Result<Self, Self::Error> {
        let (Some(make), Some(model), Some(year), Some(price)) =
            (trimmed(body.make), trimmed(body.model), body.year, body.price)
        else {
            return Err(Error::bad_request("Missing required fields"));
        };

        Ok(Self {
            make,
            model,
            year: validate_year(year)?,
            price: validate_price(price)?,
            mileage: validate_mileage(body.mileage.unwrap_or(0))?,
            fuel_type: trimmed(body.fuel_type),
            transmission: trimmed(body.transmission),
            body_type: trimmed(body.body_type),
            color: trimmed(body.color),
            description: trimmed(body.description),
            features: clean_list(body.features),
            images: clean_list(body.images),
            is_featured: body.is_featured.unwrap_or(false),
            is_active: body.is_active.unwrap_or(true),
        })
    }
}

impl TryFrom<CarUpdate> for CarUpdateDBRequest {
    type Error = Error;

    fn try_from(body: CarUpdate) -> Result<Self, Self::Error> {
        let non_empty = |field: &str, value: Option<String>| -> Result<Option<String>, Error> {
            match value {
                Some(v) if v.trim().is_empty() => Err(Error::bad_request(format!("{field} cannot be empty"))),
                other => Ok(other.map(|v| v.trim().to_string())),
            }
        };

        Ok(Self {
            make: non_empty("Make", body.make)?,
            model: non_empty("Model", body.model)?,
            year: body.year.map(validate_year).transpose()?,
            price: body.price.map(validate_price).transpose()?,
            mileage: body.mileage.map(validate_mileage).transpose()?,
            fuel_type: trimmed(body.fuel_type),
            transmission: trimmed(body.transmission),
            body_type: trimmed(body.body_type),
            color: trimmed(body.color),
            description: trimmed(body.description),
            features: body.features.map(clean_list),
            images: body.images.map(clean_list),
            is_featured: body.is_featured,
            is_active: body.is_active,
        })
    }
}

impl From<CarDBResponse> for CarResponse {
    fn from(db: CarDBResponse) -> Self {
        Self {
            id: db.id,
            make: db.make,
            model: db.model,
            year: db.year,
            price: db.price,
            mileage: db.mileage,
            fuel_type: db.fuel_type,
            transmission: db.transmission,
            body_type: db.body_type,
            color: db.color,
            description: db.description,
            features: db.features,
            images: db.images,
            is_featured: db.is_featured,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<&CarDBResponse> for CarSummary {
    fn from(db: &CarDBResponse) -> Self {
        Self {
            id: db.id,
            make: db.make.clone(),
            model: db.model.clone(),
            year: db.year,
            price: db.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_body() -> CarCreate {
        CarCreate {
            make: Some(" Toyota ".to_string()),
            model: Some("Corolla".to_string()),
            year: Some(2020),
            price: Some(Decimal::new(1_899_999, 2)),
            mileage: Some(42_000),
            features: vec!["Bluetooth".to_string(), " ".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_create_defaults_and_trimming() {
        let request = CarCreateDBRequest::try_from(valid_body()).unwrap();
        assert_eq!(request.make, "Toyota");
        assert_eq!(request.features, vec!["Bluetooth".to_string()]);
        assert!(request.is_active);
        assert!(!request.is_featured);
    }

    #[test]
    fn test_create_requires_make_model_year_price() {
        for body in [
            CarCreate { make: None, ..valid_body() },
            CarCreate {
                model: Some("  ".to_string()),
                ..valid_body()
            },
            CarCreate { year: None, ..valid_body() },
            CarCreate { price: None, ..valid_body() },
        ] {
            let err = CarCreateDBRequest::try_from(body).unwrap_err();
            assert_eq!(err.user_message(), "Missing required fields");
        }
    }

    #[test]
    fn test_create_rejects_out_of_range_values() {
        let next_year = Utc::now().year() + 1;
        assert!(CarCreateDBRequest::try_from(CarCreate { year: Some(1899), ..valid_body() }).is_err());
        assert!(CarCreateDBRequest::try_from(CarCreate { year: Some(next_year), ..valid_body() }).is_ok());
        assert!(CarCreateDBRequest::try_from(CarCreate { year: Some(next_year + 1), ..valid_body() }).is_err());
        assert!(
            CarCreateDBRequest::try_from(CarCreate {
                price: Some(Decimal::new(-1, 0)),
                ..valid_body()
            })
            .is_err()
        );
        assert!(CarCreateDBRequest::try_from(CarCreate { mileage: Some(-5), ..valid_body() }).is_err());
    }

    #[test]
    fn test_update_rejects_blank_make() {
        let update = CarUpdate {
            make: Some("".to_string()),
            ..Default::default()
        };
        assert!(CarUpdateDBRequest::try_from(update).is_err());
    }

    #[test]
    fn test_sort_wire_names() {
        assert_eq!(serde_json::to_value(CarSort::PriceDesc).unwrap(), "price_desc");
        assert_eq!("mileage_asc".parse::<CarSort>().unwrap(), CarSort::MileageAsc);
        assert!("cheapest".parse::<CarSort>().is_err());
    }
}
