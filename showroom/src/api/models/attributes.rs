//! API request/response models for search attributes (makes, body types, colors, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

use crate::{
    db::models::attributes::{AttributeCreateDBRequest, AttributeDBResponse, AttributeUpdateDBRequest},
    errors::Error,
    types::AttributeId,
};

/// Which search facet an attribute value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Make,
    BodyType,
    FuelType,
    Transmission,
    Color,
    Feature,
}

impl AttributeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKind::Make => "make",
            AttributeKind::BodyType => "body_type",
            AttributeKind::FuelType => "fuel_type",
            AttributeKind::Transmission => "transmission",
            AttributeKind::Color => "color",
            AttributeKind::Feature => "feature",
        }
    }
}

impl std::fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttributeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "make" => Ok(AttributeKind::Make),
            "body_type" => Ok(AttributeKind::BodyType),
            "fuel_type" => Ok(AttributeKind::FuelType),
            "transmission" => Ok(AttributeKind::Transmission),
            "color" => Ok(AttributeKind::Color),
            "feature" => Ok(AttributeKind::Feature),
            other => Err(format!("unknown attribute kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributeCreate {
    pub kind: Option<AttributeKind>,
    pub value: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributeUpdate {
    pub value: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttributeResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: AttributeId,
    pub kind: AttributeKind,
    pub value: String,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAttributesQuery {
    /// Restrict to one facet
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[param(value_type = Option<AttributeKind>)]
    pub kind: Option<AttributeKind>,
}

impl TryFrom<AttributeCreate> for AttributeCreateDBRequest {
    type Error = Error;

    fn try_from(body: AttributeCreate) -> Result<Self, Self::Error> {
        let value = body.value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let (Some(kind), Some(value)) = (body.kind, value) else {
            return Err(Error::bad_request("Missing required fields"));
        };

        Ok(Self {
            kind,
            value,
            sort_order: body.sort_order.unwrap_or(0),
            is_active: body.is_active.unwrap_or(true),
        })
    }
}

impl TryFrom<AttributeUpdate> for AttributeUpdateDBRequest {
    type Error = Error;

    fn try_from(body: AttributeUpdate) -> Result<Self, Self::Error> {
        let value = match body.value {
            Some(v) if v.trim().is_empty() => return Err(Error::bad_request("Value cannot be empty")),
            other => other.map(|v| v.trim().to_string()),
        };

        Ok(Self {
            value,
            sort_order: body.sort_order,
            is_active: body.is_active,
        })
    }
}

impl From<AttributeDBResponse> for AttributeResponse {
    fn from(db: AttributeDBResponse) -> Self {
        Self {
            id: db.id,
            kind: db.kind,
            value: db.value,
            sort_order: db.sort_order,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(serde_json::to_value(AttributeKind::BodyType).unwrap(), "body_type");
        assert_eq!("fuel_type".parse::<AttributeKind>().unwrap(), AttributeKind::FuelType);
        assert!("engine".parse::<AttributeKind>().is_err());
    }

    #[test]
    fn test_create_requires_kind_and_value() {
        let missing_kind = AttributeCreate {
            value: Some("Red".to_string()),
            ..Default::default()
        };
        assert!(AttributeCreateDBRequest::try_from(missing_kind).is_err());

        let request = AttributeCreateDBRequest::try_from(AttributeCreate {
            kind: Some(AttributeKind::Color),
            value: Some(" Red ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.value, "Red");
        assert!(request.is_active);
    }
}
