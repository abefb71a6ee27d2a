//! API request/response models for customer inquiries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

use super::{cars::CarSummary, pagination::Pagination};
use crate::{
    db::models::inquiries::{InquiryCreateDBRequest, InquiryDBResponse},
    errors::Error,
    types::{CarId, InquiryId},
};

/// Follow-up state of an inquiry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    #[default]
    New,
    Contacted,
    Closed,
}

impl InquiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::New => "new",
            InquiryStatus::Contacted => "contacted",
            InquiryStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InquiryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(InquiryStatus::New),
            "contacted" => Ok(InquiryStatus::Contacted),
            "closed" => Ok(InquiryStatus::Closed),
            other => Err(format!("unknown inquiry status '{other}'")),
        }
    }
}

/// Body of the public contact form, `POST /api/inquiries`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct InquiryCreate {
    /// Listing the customer is asking about. Not checked against existing listings.
    #[schema(value_type = Option<String>, format = "uuid")]
    pub car_id: Option<CarId>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

/// Body of `PATCH /api/admin/inquiries/{id}`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct InquiryStatusUpdate {
    pub status: Option<InquiryStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InquiryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: InquiryId,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub car_id: Option<CarId>,
    /// The listing behind `carId`. `null` when there is no `carId` or the listing no longer exists.
    pub car: Option<CarSummary>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InquiryResponse {
    pub fn with_car(mut self, car: Option<CarSummary>) -> Self {
        self.car = car;
        self
    }
}

/// Query parameters for `GET /api/admin/inquiries`.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListInquiriesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[param(value_type = Option<InquiryStatus>)]
    pub status: Option<InquiryStatus>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[param(value_type = Option<String>, format = "uuid")]
    pub car_id: Option<CarId>,
}

pub(crate) fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    }
}

impl TryFrom<InquiryCreate> for InquiryCreateDBRequest {
    type Error = Error;

    fn try_from(body: InquiryCreate) -> Result<Self, Self::Error> {
        let field = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (Some(name), Some(email), Some(message)) = (field(body.name), field(body.email), field(body.message)) else {
            return Err(Error::bad_request("Missing required fields"));
        };

        if !is_plausible_email(&email) {
            return Err(Error::bad_request("Invalid email address"));
        }

        Ok(Self {
            car_id: body.car_id,
            name,
            email: email.to_lowercase(),
            phone: field(body.phone),
            message,
        })
    }
}

impl From<InquiryDBResponse> for InquiryResponse {
    fn from(db: InquiryDBResponse) -> Self {
        Self {
            id: db.id,
            car_id: db.car_id,
            car: None,
            name: db.name,
            email: db.email,
            phone: db.phone,
            message: db.message,
            status: db.status,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
