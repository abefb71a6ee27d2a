use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use super::{PgStore, parse_column};
use crate::{
    db::{
        errors::{DbError, Result},
        models::attributes::{AttributeCreateDBRequest, AttributeDBResponse, AttributeFilter, AttributeUpdateDBRequest},
        store::AttributeStore,
    },
    types::{AttributeId, abbrev_uuid},
};

#[derive(Debug, FromRow)]
struct Attribute {
    id: AttributeId,
    kind: String,
    value: String,
    sort_order: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<Attribute> for AttributeDBResponse {
    type Error = DbError;

    fn try_from(row: Attribute) -> Result<Self> {
        Ok(Self {
            kind: parse_column("car_attributes.kind", &row.kind)?,
            id: row.id,
            value: row.value,
            sort_order: row.sort_order,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const COLUMNS: &str = "id, kind, value, sort_order, is_active, created_at, updated_at";

#[async_trait]
impl AttributeStore for PgStore {
    #[instrument(skip(self, request), fields(kind = %request.kind), err)]
    async fn create_attribute(&self, request: &AttributeCreateDBRequest) -> Result<AttributeDBResponse> {
        let row = sqlx::query_as::<_, Attribute>(&format!(
            "INSERT INTO car_attributes (id, kind, value, sort_order, is_active) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(request.kind.as_str())
        .bind(&request.value)
        .bind(request.sort_order)
        .bind(request.is_active)
        .fetch_one(self.pool())
        .await?;

        row.try_into()
    }

    #[instrument(skip(self), fields(attribute_id = %abbrev_uuid(&id)), err)]
    async fn get_attribute(&self, id: AttributeId) -> Result<Option<AttributeDBResponse>> {
        sqlx::query_as::<_, Attribute>(&format!("SELECT {COLUMNS} FROM car_attributes WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_attributes(&self, filter: &AttributeFilter) -> Result<Vec<AttributeDBResponse>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM car_attributes WHERE TRUE"));
        if filter.active_only {
            query.push(" AND is_active");
        }
        if let Some(kind) = filter.kind {
            query.push(" AND kind = ").push_bind(kind.as_str());
        }
        query.push(" ORDER BY kind, sort_order, value");

        let rows = query.build_query_as::<Attribute>().fetch_all(self.pool()).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self, request), fields(attribute_id = %abbrev_uuid(&id)), err)]
    async fn update_attribute(&self, id: AttributeId, request: &AttributeUpdateDBRequest) -> Result<Option<AttributeDBResponse>> {
        sqlx::query_as::<_, Attribute>(&format!(
            "UPDATE car_attributes SET \
                value = COALESCE($2, value), \
                sort_order = COALESCE($3, sort_order), \
                is_active = COALESCE($4, is_active), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&request.value)
        .bind(request.sort_order)
        .bind(request.is_active)
        .fetch_optional(self.pool())
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    #[instrument(skip(self), fields(attribute_id = %abbrev_uuid(&id)), err)]
    async fn delete_attribute(&self, id: AttributeId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM car_attributes WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
