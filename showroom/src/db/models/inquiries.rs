//! Store models for customer inquiries.

use chrono::{DateTime, Utc};

use crate::{
    api::models::inquiries::InquiryStatus,
    types::{CarId, InquiryId},
};

/// Store request for a new inquiry. New inquiries always start in [`InquiryStatus::New`].
#[derive(Debug, Clone)]
pub struct InquiryCreateDBRequest {
    pub car_id: Option<CarId>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InquiryDBResponse {
    pub id: InquiryId,
    /// Not enforced: the listing may have been deleted since
    pub car_id: Option<CarId>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct InquiryFilter {
    pub skip: i64,
    pub limit: i64,
    pub status: Option<InquiryStatus>,
    pub car_id: Option<CarId>,
}

impl InquiryFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            status: None,
            car_id: None,
        }
    }

    pub fn matches(&self, inquiry: &InquiryDBResponse) -> bool {
        self.status.is_none_or(|status| status == inquiry.status) && self.car_id.is_none_or(|car_id| inquiry.car_id == Some(car_id))
    }
}
