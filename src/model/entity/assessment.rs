use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::entity::{QuestionSet, QuestionSetOwner, QuestionSetParams};
use crate::model::{
    CrudRepository, DatabaseError, DatabaseResult, ModelManager, ResourceType, ResourceTyped,
};
use crate::web::AuthenticatedUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentStatus {
    Draft,
    Published,
}

impl AssessmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

impl From<&str> for AssessmentStatus {
    fn from(value: &str) -> Self {
        match value {
            "published" => Self::Published,
            _ => Self::Draft,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Assessment {
    id: Uuid,
    title: String,
    description: String,
    author_id: Uuid,
    status: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AssessmentCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl AssessmentCreate {
    pub fn validate(&self) -> DatabaseResult<()> {
        if self.title.trim().is_empty() {
            return Err(DatabaseError::validation("title must not be empty"));
        }
        if self.end_date <= self.start_date {
            return Err(DatabaseError::validation("end_date must be after start_date"));
        }
        Ok(())
    }
}

impl ResourceTyped for Assessment {
    fn get_resource_type() -> ResourceType {
        ResourceType::Assessment
    }
}

impl Assessment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author_id(&self) -> Uuid {
        self.author_id
    }

    pub fn status(&self) -> AssessmentStatus {
        AssessmentStatus::from(self.status.as_str())
    }

    pub fn is_running_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }

    pub async fn set_status(mut self, mm: &ModelManager, status: AssessmentStatus) -> DatabaseResult<Self> {
        sqlx::query("UPDATE assessments SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        self.status = status.as_str().to_string();
        Ok(self)
    }
}

#[async_trait]
impl CrudRepository<Assessment, AssessmentCreate, Uuid> for Assessment {
    async fn create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: AssessmentCreate,
    ) -> DatabaseResult<Self> {
        data.validate()?;
        let row = sqlx::query_as(
            r#"
            INSERT INTO assessments (id, title, description, author_id, status, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.title.trim())
        .bind(&data.description)
        .bind(actor.user_id())
        .bind(AssessmentStatus::Draft.as_str())
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: AssessmentCreate,
    ) -> DatabaseResult<Self> {
        data.validate()?;
        sqlx::query(
            "UPDATE assessments SET title = $1, description = $2, start_date = $3, end_date = $4 WHERE id = $5",
        )
        .bind(data.title.trim())
        .bind(&data.description)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.title = data.title.trim().to_string();
        self.description = data.description;
        self.start_date = data.start_date;
        self.end_date = data.end_date;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM assessments WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM assessments WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    /// Learners only see published assessments, authors also their drafts.
    async fn list(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT * FROM assessments
            WHERE $1 OR status = 'published' OR author_id = $2
            ORDER BY start_date DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(actor.is_admin())
        .bind(actor.user_id())
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM assessments WHERE $1 OR status = 'published' OR author_id = $2",
        )
        .bind(actor.is_admin())
        .bind(actor.user_id())
        .fetch_one(mm.executor())
        .await?;
        Ok(result)
    }
}

impl_paginatable_for!(Assessment, AssessmentCreate, Uuid);

impl Assessment {
    /// Creates a draft assessment together with the question set it owns.
    pub async fn create_with_question_set(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        data: AssessmentCreate,
        params: &QuestionSetParams,
    ) -> DatabaseResult<(Self, QuestionSet)> {
        data.validate()?;
        params.validate()?;
        let mut tx = mm.begin().await?;

        let assessment: Self = sqlx::query_as(
            r#"
            INSERT INTO assessments (id, title, description, author_id, status, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.title.trim())
        .bind(&data.description)
        .bind(actor.user_id())
        .bind(AssessmentStatus::Draft.as_str())
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_one(&mut *tx)
        .await?;

        let question_set =
            QuestionSet::create_in(&mut tx, QuestionSetOwner::Assessment(assessment.id), params).await?;

        tx.commit().await?;
        Ok((assessment, question_set))
    }
}

#[async_trait]
impl HasOwner for Assessment {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.author_id)
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;

    #[test]
    fn create_requires_a_forward_window() {
        let now = Utc::now();
        let ok = AssessmentCreate {
            title: String::from("Rust basics"),
            description: String::new(),
            start_date: now,
            end_date: now + Duration::days(7),
        };
        assert!(ok.validate().is_ok());

        let backwards = AssessmentCreate {
            end_date: now - Duration::days(1),
            ..ok
        };
        assert!(backwards.validate().is_err());
    }

    #[test]
    fn status_falls_back_to_draft() {
        assert_eq!(AssessmentStatus::from("published"), AssessmentStatus::Published);
        assert_eq!(AssessmentStatus::from("unknown"), AssessmentStatus::Draft);
    }
}
