use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::access::HasOwner;
use crate::model::{CrudRepository, DatabaseResult, ModelManager, ResourceType, ResourceTyped};
use crate::web::AuthenticatedUser;

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Section {
    id: Uuid,
    course_id: Uuid,
    title: String,
    order_index: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SectionCreate {
    pub course_id: Uuid,
    pub title: String,
    pub order_index: Option<i32>,
}

impl ResourceTyped for Section {
    fn get_resource_type() -> ResourceType {
        ResourceType::Section
    }
}

impl Section {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }
}

#[async_trait]
impl CrudRepository<Section, SectionCreate, Uuid> for Section {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: SectionCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "INSERT INTO sections (id, course_id, title, order_index) VALUES ($1,$2,$3,$4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(data.course_id)
        .bind(&data.title)
        .bind(data.order_index.unwrap_or(0))
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    /// The section stays in its course, `course_id` of `data` is ignored.
    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: SectionCreate,
    ) -> DatabaseResult<Self> {
        let order_index = data.order_index.unwrap_or(self.order_index);
        sqlx::query("UPDATE sections SET title = $1, order_index = $2 WHERE id = $3")
            .bind(&data.title)
            .bind(order_index)
            .bind(self.id)
            .execute(mm.executor())
            .await?;

        self.title = data.title;
        self.order_index = order_index;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM sections WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM sections WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM sections ORDER BY course_id, order_index LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sections")
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }
}

impl Section {
    pub async fn all_by_course(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM sections WHERE course_id = $1 ORDER BY order_index, title")
            .bind(course_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }
}

#[async_trait]
impl HasOwner for Section {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let author: Uuid = sqlx::query_scalar("SELECT author_id FROM courses WHERE id = $1")
            .bind(self.course_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(author)
    }
}
