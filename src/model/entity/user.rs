use crate::impl_paginatable_for;
use crate::model::DatabaseError;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::web::AuthenticatedUser;
use crate::web::UserRole;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct UserEntity {
    id: uuid::Uuid,
    username: String,
    email: Option<String>,
    #[serde(skip)]
    password_hash: String,
    role: String,
    department_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UserEntityCreateUpdate {
    pub username: String,
    pub email: Option<String>,
    /// Ignored on update.
    pub password_hash: String,
}

impl ResourceTyped for UserEntity {
    fn get_resource_type() -> crate::model::repo::ResourceType {
        crate::model::repo::ResourceType::User
    }
}

impl UserEntity {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn hash(&self) -> &str {
        &self.password_hash
    }

    pub fn role(&self) -> UserRole {
        UserRole::from(self.role.as_str())
    }

    pub fn department_id(&self) -> Option<Uuid> {
        self.department_id
    }
}

#[async_trait::async_trait]
impl CrudRepository<UserEntity, UserEntityCreateUpdate, uuid::Uuid> for UserEntity {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityCreateUpdate,
    ) -> DatabaseResult<Self> {
        let role = UserRole::Trainee.to_string();
        let user = sqlx::query_as(
            r#"
            INSERT INTO users (id, username, email, password_hash, role)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&role)
        .fetch_one(mm.executor())
        .await
        .map_err(|e| DatabaseError::unique_as_conflict(e, "username"))?;

        Ok(user)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserEntityCreateUpdate,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE users SET username = $1, email = $2 WHERE id = $3")
            .bind(&data.username)
            .bind(&data.email)
            .bind(self.id)
            .execute(mm.executor())
            .await
            .map_err(|e| DatabaseError::unique_as_conflict(e, "username"))?;

        self.username = data.username;
        self.email = data.email;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM users ORDER BY created_at, username LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(UserEntity, UserEntityCreateUpdate, Uuid);

#[async_trait]
impl HasOwner for UserEntity {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.id) // owners of users are themselves
    }
}

impl UserEntity {
    pub async fn find_by_username(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        username: &str,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    /// Changes role and department; only admins get here.
    pub async fn assign(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        role: UserRole,
        department_id: Option<Uuid>,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE users SET role = $1, department_id = $2 WHERE id = $3")
            .bind(role.to_string())
            .bind(department_id)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.role = role.to_string();
        self.department_id = department_id;
        Ok(self)
    }

    /// Creates the administrator account from config unless it already exists.
    #[tracing::instrument(skip(mm, password_hash))]
    pub async fn ensure_admin(
        mm: &ModelManager,
        username: &str,
        password_hash: String,
    ) -> DatabaseResult<()> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, role)
            VALUES ($1,$2,$3,$4)
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .bind(UserRole::Admin.to_string())
        .execute(mm.executor())
        .await?;

        if inserted.rows_affected() > 0 {
            tracing::info!("bootstrap administrator `{}` created", username);
        }
        Ok(())
    }
}
