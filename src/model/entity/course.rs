use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::{CrudRepository, DatabaseResult, ModelManager, ResourceType, ResourceTyped};
use crate::web::{AuthenticatedUser, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Draft,
    Published,
    Archived,
}

impl From<&str> for CourseStatus {
    fn from(value: &str) -> Self {
        match value {
            "published" => Self::Published,
            "archived" => Self::Archived,
            _ => Self::Draft,
        }
    }
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Course {
    id: Uuid,
    title: String,
    description: String,
    author_id: Uuid,
    group_id: Option<Uuid>,
    status: String,
    certificate_enabled: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CourseCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub group_id: Option<Uuid>,
    pub certificate_enabled: Option<bool>,
}

impl ResourceTyped for Course {
    fn get_resource_type() -> ResourceType {
        ResourceType::Course
    }
}

impl Course {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn author_id(&self) -> Uuid {
        self.author_id
    }

    pub fn group_id(&self) -> Option<Uuid> {
        self.group_id
    }

    pub fn status(&self) -> CourseStatus {
        CourseStatus::from(self.status.as_str())
    }

    pub fn certificate_enabled(&self) -> bool {
        self.certificate_enabled
    }

    pub fn is_published(&self) -> bool {
        self.status() == CourseStatus::Published
    }
}

// Trainees see published courses open to everybody or to one of their groups,
// trainers additionally see their own drafts, admins see everything.
const VISIBLE_COURSES: &str = r#"
    FROM courses c
    WHERE $1 = 'admin'
       OR c.author_id = $2
       OR (c.status = 'published'
           AND (c.group_id IS NULL
                OR c.group_id IN (SELECT group_id FROM group_members WHERE user_id = $2)))
"#;

#[async_trait]
impl CrudRepository<Course, CourseCreate, Uuid> for Course {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO courses (id, title, description, author_id, group_id, status, certificate_enabled)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.title)
        .bind(&data.description)
        .bind(actor.user_id())
        .bind(data.group_id)
        .bind(CourseStatus::Draft.to_string())
        .bind(data.certificate_enabled.unwrap_or(true))
        .fetch_one(mm.executor())
        .await?;

        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: CourseCreate,
    ) -> DatabaseResult<Self> {
        let certificate_enabled = data.certificate_enabled.unwrap_or(self.certificate_enabled);
        sqlx::query(
            "UPDATE courses SET title = $1, description = $2, group_id = $3, certificate_enabled = $4 WHERE id = $5",
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.group_id)
        .bind(certificate_enabled)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.title = data.title;
        self.description = data.description;
        self.group_id = data.group_id;
        self.certificate_enabled = certificate_enabled;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM courses WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let query = format!("SELECT c.* {VISIBLE_COURSES} ORDER BY c.created_at DESC LIMIT $3 OFFSET $4");
        let result = sqlx::query_as(&query)
            .bind(actor.user_role().to_string())
            .bind(actor.user_id())
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let query = format!("SELECT COUNT(*) {VISIBLE_COURSES}");
        let result: i64 = sqlx::query_scalar(&query)
            .bind(actor.user_role().to_string())
            .bind(actor.user_id())
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }
}

impl_paginatable_for!(Course, CourseCreate, Uuid);

#[async_trait]
impl HasOwner for Course {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.author_id)
    }
}

impl Course {
    pub async fn set_status(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        status: CourseStatus,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE courses SET status = $1 WHERE id = $2")
            .bind(status.to_string())
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        self.status = status.to_string();
        Ok(self)
    }

    pub async fn lesson_count(&self, mm: &ModelManager) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons WHERE course_id = $1")
            .bind(self.id)
            .fetch_one(mm.executor())
            .await?;
        Ok(count)
    }

    /// Whether `actor` may open the course content without being enrolled.
    pub fn is_managed_by(&self, actor: &AuthenticatedUser) -> bool {
        actor.user_role() == UserRole::Admin || self.author_id == actor.user_id()
    }

    /// Whether `actor` may enroll: the course must be published and, when it
    /// is bound to a group, the actor must belong to it.
    pub async fn is_open_for(
        &self,
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<bool> {
        if !self.is_published() {
            return Ok(false);
        }
        let Some(group_id) = self.group_id else {
            return Ok(true);
        };
        let member: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group_id)
        .bind(actor.user_id())
        .fetch_one(mm.executor())
        .await?;
        Ok(member)
    }
}
