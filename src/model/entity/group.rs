use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::{
    CrudRepository, DatabaseError, DatabaseResult, ModelManager, ResourceType, ResourceTyped,
};
use crate::web::AuthenticatedUser;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Group {
    id: Uuid,
    name: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct GroupCreate {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct GroupMember {
    pub user_id: Uuid,
    pub username: String,
    pub added_at: DateTime<Utc>,
}

impl ResourceTyped for Group {
    fn get_resource_type() -> ResourceType {
        ResourceType::Group
    }
}

impl Group {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_by(&self) -> Uuid {
        self.created_by
    }
}

#[async_trait]
impl CrudRepository<Group, GroupCreate, Uuid> for Group {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: GroupCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "INSERT INTO groups (id, name, created_by) VALUES ($1,$2,$3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.name.trim())
        .bind(actor.user_id())
        .fetch_one(mm.executor())
        .await
        .map_err(|e| DatabaseError::unique_as_conflict(e, "group"))?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: GroupCreate,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE groups SET name = $1 WHERE id = $2")
            .bind(data.name.trim())
            .bind(self.id)
            .execute(mm.executor())
            .await
            .map_err(|e| DatabaseError::unique_as_conflict(e, "group"))?;

        self.name = data.name.trim().to_string();
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM groups WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM groups WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM groups ORDER BY name LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups")
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }
}

impl_paginatable_for!(Group, GroupCreate, Uuid);

#[async_trait]
impl HasOwner for Group {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.created_by)
    }
}

// Membership

impl Group {
    pub async fn add_member(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        user_id: Uuid,
    ) -> DatabaseResult<()> {
        sqlx::query("INSERT INTO group_members (group_id, user_id) VALUES ($1,$2)")
            .bind(self.id)
            .bind(user_id)
            .execute(mm.executor())
            .await
            .map_err(|e| DatabaseError::unique_as_conflict(e, "group member"))?;
        Ok(())
    }

    /// Returns `false` when the user was not a member.
    pub async fn remove_member(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        user_id: Uuid,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(self.id)
            .bind(user_id)
            .execute(mm.executor())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn members(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<GroupMember>> {
        let rows = sqlx::query_as(
            r#"
            SELECT gm.user_id, u.username, gm.added_at
            FROM group_members gm
            JOIN users u ON u.id = gm.user_id
            WHERE gm.group_id = $1
            ORDER BY u.username
            "#,
        )
        .bind(self.id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }

    pub async fn ids_for_user(mm: &ModelManager, user_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar("SELECT group_id FROM group_members WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(ids)
    }
}
