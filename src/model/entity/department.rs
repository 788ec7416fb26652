use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::impl_paginatable_for;
use crate::model::{
    CrudRepository, DatabaseError, DatabaseResult, ModelManager, ResourceType, ResourceTyped,
};
use crate::web::AuthenticatedUser;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Department {
    id: Uuid,
    name: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DepartmentCreate {
    pub name: String,
    pub is_active: Option<bool>,
}

impl ResourceTyped for Department {
    fn get_resource_type() -> ResourceType {
        ResourceType::Department
    }
}

impl Department {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

#[async_trait]
impl CrudRepository<Department, DepartmentCreate, Uuid> for Department {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: DepartmentCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "INSERT INTO departments (id, name, is_active) VALUES ($1,$2,$3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.name.trim())
        .bind(data.is_active.unwrap_or(true))
        .fetch_one(mm.executor())
        .await
        .map_err(|e| DatabaseError::unique_as_conflict(e, "department"))?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: DepartmentCreate,
    ) -> DatabaseResult<Self> {
        let is_active = data.is_active.unwrap_or(self.is_active);
        sqlx::query("UPDATE departments SET name = $1, is_active = $2 WHERE id = $3")
            .bind(data.name.trim())
            .bind(is_active)
            .bind(self.id)
            .execute(mm.executor())
            .await
            .map_err(|e| DatabaseError::unique_as_conflict(e, "department"))?;

        self.name = data.name.trim().to_string();
        self.is_active = is_active;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM departments WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM departments ORDER BY name LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }
}

impl_paginatable_for!(Department, DepartmentCreate, Uuid);
