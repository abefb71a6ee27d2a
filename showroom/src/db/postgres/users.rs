use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;
use uuid::Uuid;

use super::{PgStore, parse_column};
use crate::{
    db::{
        errors::{DbError, Result},
        models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
        store::UserStore,
    },
    types::{UserId, abbrev_uuid},
};

#[derive(Debug, FromRow)]
struct User {
    id: UserId,
    email: String,
    name: String,
    role: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<User> for UserDBResponse {
    type Error = DbError;

    fn try_from(row: User) -> Result<Self> {
        Ok(Self {
            role: parse_column("users.role", &row.role)?,
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_login: row.last_login,
        })
    }
}

const COLUMNS: &str = "id, email, name, role, password_hash, created_at, updated_at, last_login";

#[async_trait]
impl UserStore for PgStore {
    #[instrument(skip(self, request), fields(role = %request.role), err)]
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let row = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, name, role, password_hash) VALUES ($1, LOWER($2), $3, $4, $5) RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&request.email)
        .bind(&request.name)
        .bind(request.role.as_str())
        .bind(&request.password_hash)
        .fetch_one(self.pool())
        .await?;

        row.try_into()
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    #[instrument(skip(self, email), err)]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"))
            .bind(email)
            .fetch_optional(self.pool())
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<UserDBResponse>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {COLUMNS} FROM users ORDER BY created_at, email LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self), err)]
    async fn count_users(&self) -> Result<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users").fetch_one(self.pool()).await?)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<Option<UserDBResponse>> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                role = COALESCE($3, role), \
                password_hash = COALESCE($4, password_hash), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&request.name)
        .bind(request.role.map(|role| role.as_str()))
        .bind(&request.password_hash)
        .fetch_optional(self.pool())
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(self.pool()).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn record_login(&self, id: UserId) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::permissions::Role, errors::Error};
    use axum::http::StatusCode;
    use sqlx::PgPool;

    fn user(email: &str, role: Role) -> UserCreateDBRequest {
        UserCreateDBRequest {
            email: email.to_string(),
            name: "Sales Desk".to_string(),
            role,
            password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA".to_string(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_email_is_unique_ignoring_case(pool: PgPool) {
        let store = PgStore::new(pool);

        let created = store.create_user(&user("Sales@Example.org", Role::Editor)).await.unwrap();
        assert_eq!(created.email, "sales@example.org");

        let found = store.get_user_by_email("SALES@example.org").await.unwrap().expect("user should exist");
        assert_eq!(found.id, created.id);

        let err = Error::from(store.create_user(&user("sales@example.org", Role::Viewer)).await.unwrap_err());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.user_message(), "An account with this email address already exists");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_partial_update_and_login_stamp(pool: PgPool) {
        let store = PgStore::new(pool);
        let created = store.create_user(&user("desk@example.org", Role::Viewer)).await.unwrap();
        assert!(created.last_login.is_none());

        let promote = UserUpdateDBRequest {
            role: Some(Role::Editor),
            ..Default::default()
        };
        let updated = store.update_user(created.id, &promote).await.unwrap().expect("user should exist");
        assert_eq!(updated.role, Role::Editor);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.password_hash, created.password_hash);

        store.record_login(created.id).await.unwrap();
        let fetched = store.get_user(created.id).await.unwrap().expect("user should exist");
        assert!(fetched.last_login.is_some());

        assert!(store.update_user(Uuid::new_v4(), &promote).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_count_and_delete(pool: PgPool) {
        let store = PgStore::new(pool);
        let first = store.create_user(&user("one@example.org", Role::Admin)).await.unwrap();
        store.create_user(&user("two@example.org", Role::User)).await.unwrap();

        assert_eq!(store.count_users().await.unwrap(), 2);
        assert_eq!(store.list_users(0, 10).await.unwrap().len(), 2);
        assert_eq!(store.list_users(1, 10).await.unwrap().len(), 1);

        assert!(store.delete_user(first.id).await.unwrap());
        assert!(!store.delete_user(first.id).await.unwrap());
        assert_eq!(store.count_users().await.unwrap(), 1);
    }
}
