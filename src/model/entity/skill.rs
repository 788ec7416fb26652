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
pub struct Skill {
    id: Uuid,
    name: String,
    description: String,
    is_active: bool,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SkillCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub is_active: Option<bool>,
}

/// Skill held by a user, with the score that earned it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct UserSkill {
    pub skill_id: Uuid,
    pub name: String,
    pub score: f64,
    pub acquired_at: DateTime<Utc>,
}

impl ResourceTyped for Skill {
    fn get_resource_type() -> ResourceType {
        ResourceType::Skill
    }
}

impl Skill {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

#[async_trait]
impl CrudRepository<Skill, SkillCreate, Uuid> for Skill {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: SkillCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "INSERT INTO skills (id, name, description, is_active) VALUES ($1,$2,$3,$4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.name.trim())
        .bind(&data.description)
        .bind(data.is_active.unwrap_or(true))
        .fetch_one(mm.executor())
        .await
        .map_err(|e| DatabaseError::unique_as_conflict(e, "skill"))?;
        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: SkillCreate,
    ) -> DatabaseResult<Self> {
        let is_active = data.is_active.unwrap_or(self.is_active);
        sqlx::query("UPDATE skills SET name = $1, description = $2, is_active = $3 WHERE id = $4")
            .bind(data.name.trim())
            .bind(&data.description)
            .bind(is_active)
            .bind(self.id)
            .execute(mm.executor())
            .await
            .map_err(|e| DatabaseError::unique_as_conflict(e, "skill"))?;

        self.name = data.name.trim().to_string();
        self.description = data.description;
        self.is_active = is_active;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM skills WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM skills WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM skills ORDER BY name LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM skills")
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }
}

impl_paginatable_for!(Skill, SkillCreate, Uuid);

impl UserSkill {
    pub async fn all_for_user(mm: &ModelManager, user_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT us.skill_id, s.name, us.score, us.acquired_at
            FROM user_skills us
            JOIN skills s ON s.id = us.skill_id
            WHERE us.user_id = $1
            ORDER BY s.name
            "#,
        )
        .bind(user_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }

    /// Inserts the skill or raises the stored score, never lowers it.
    pub async fn upsert(
        mm: &ModelManager,
        user_id: Uuid,
        skill_id: Uuid,
        score: f64,
    ) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_skills (user_id, skill_id, score)
            VALUES ($1,$2,$3)
            ON CONFLICT (user_id, skill_id)
            DO UPDATE SET score = GREATEST(user_skills.score, EXCLUDED.score), acquired_at = now()
            "#,
        )
        .bind(user_id)
        .bind(skill_id)
        .bind(score)
        .execute(mm.executor())
        .await?;
        Ok(())
    }
}
