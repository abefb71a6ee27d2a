//! Store models for search attributes.

use chrono::{DateTime, Utc};

use crate::{api::models::attributes::AttributeKind, types::AttributeId};

#[derive(Debug, Clone)]
pub struct AttributeCreateDBRequest {
    pub kind: AttributeKind,
    pub value: String,
    pub sort_order: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AttributeUpdateDBRequest {
    pub value: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDBResponse {
    pub id: AttributeId,
    pub kind: AttributeKind,
    pub value: String,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attributes are few, so listing them is not paginated.
#[derive(Debug, Clone, Default)]
pub struct AttributeFilter {
    pub kind: Option<AttributeKind>,
    pub active_only: bool,
}

impl AttributeFilter {
    pub fn matches(&self, attribute: &AttributeDBResponse) -> bool {
        (!self.active_only || attribute.is_active) && self.kind.is_none_or(|kind| kind == attribute.kind)
    }
}
