use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use super::{PgStore, parse_column};
use crate::{
    api::models::inquiries::InquiryStatus,
    db::{
        errors::{DbError, Result},
        models::inquiries::{InquiryCreateDBRequest, InquiryDBResponse, InquiryFilter},
        store::InquiryStore,
    },
    types::{CarId, InquiryId, abbrev_uuid},
};

#[derive(Debug, FromRow)]
struct Inquiry {
    id: InquiryId,
    car_id: Option<CarId>,
    name: String,
    email: String,
    phone: Option<String>,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<Inquiry> for InquiryDBResponse {
    type Error = DbError;

    fn try_from(row: Inquiry) -> Result<Self> {
        Ok(Self {
            status: parse_column("inquiries.status", &row.status)?,
            id: row.id,
            car_id: row.car_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            message: row.message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const COLUMNS: &str = "id, car_id, name, email, phone, message, status, created_at, updated_at";

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &InquiryFilter) {
    query.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(car_id) = filter.car_id {
        query.push(" AND car_id = ").push_bind(car_id);
    }
}

#[async_trait]
impl InquiryStore for PgStore {
    #[instrument(skip(self, request), err)]
    async fn create_inquiry(&self, request: &InquiryCreateDBRequest) -> Result<InquiryDBResponse> {
        let row = sqlx::query_as::<_, Inquiry>(&format!(
            "INSERT INTO inquiries (id, car_id, name, email, phone, message, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(request.car_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.message)
        .bind(InquiryStatus::New.as_str())
        .fetch_one(self.pool())
        .await?;

        row.try_into()
    }

    #[instrument(skip(self), fields(inquiry_id = %abbrev_uuid(&id)), err)]
    async fn get_inquiry(&self, id: InquiryId) -> Result<Option<InquiryDBResponse>> {
        sqlx::query_as::<_, Inquiry>(&format!("SELECT {COLUMNS} FROM inquiries WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    #[instrument(skip(self, filter), fields(skip = filter.skip, limit = filter.limit), err)]
    async fn list_inquiries(&self, filter: &InquiryFilter) -> Result<Vec<InquiryDBResponse>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM inquiries"));
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);

        let rows = query.build_query_as::<Inquiry>().fetch_all(self.pool()).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self, filter), err)]
    async fn count_inquiries(&self, filter: &InquiryFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM inquiries");
        push_filter(&mut query, filter);

        Ok(query.build_query_scalar::<i64>().fetch_one(self.pool()).await?)
    }

    #[instrument(skip(self), fields(inquiry_id = %abbrev_uuid(&id), status = %status), err)]
    async fn update_inquiry_status(&self, id: InquiryId, status: InquiryStatus) -> Result<Option<InquiryDBResponse>> {
        sqlx::query_as::<_, Inquiry>(&format!(
            "UPDATE inquiries SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(self.pool())
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    #[instrument(skip(self), fields(inquiry_id = %abbrev_uuid(&id)), err)]
    async fn delete_inquiry(&self, id: InquiryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM inquiries WHERE id = $1").bind(id).execute(self.pool()).await?;
        Ok(result.rows_affected() > 0)
    }
}
