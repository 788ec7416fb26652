use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{DatabaseError, DatabaseResult, ModelManager, ResourceType, ResourceTyped};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct AssignmentSubmission {
    id: Uuid,
    lesson_id: Uuid,
    user_id: Uuid,
    answer: String,
    file_url: Option<String>,
    submitted_at: DateTime<Utc>,
    mark: Option<f64>,
    review: Option<String>,
    is_passed: Option<bool>,
    reviewed_by: Option<Uuid>,
    reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AssignmentSubmit {
    pub answer: String,
    pub file_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AssignmentReview {
    pub mark: f64,
    #[serde(default)]
    pub review: String,
    pub is_passed: bool,
}

impl ResourceTyped for AssignmentSubmission {
    fn get_resource_type() -> ResourceType {
        ResourceType::Assignment
    }
}

impl AssignmentSubmission {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn is_reviewed(&self) -> bool {
        self.reviewed_at.is_some()
    }

    pub fn is_passed(&self) -> Option<bool> {
        self.is_passed
    }

    pub fn mark(&self) -> Option<f64> {
        self.mark
    }

    pub fn review(&self) -> Option<&str> {
        self.review.as_deref()
    }

    /// Creates or replaces the learner's answer. Reviewed submissions are frozen.
    pub async fn submit(
        mm: &ModelManager,
        lesson_id: Uuid,
        user_id: Uuid,
        data: AssignmentSubmit,
    ) -> DatabaseResult<Self> {
        if data.answer.trim().is_empty() && data.file_url.is_none() {
            return Err(DatabaseError::validation("an answer or a file is required"));
        }

        let row: Option<Self> = sqlx::query_as(
            r#"
            INSERT INTO assignment_submissions (id, lesson_id, user_id, answer, file_url, submitted_at)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (lesson_id, user_id) DO UPDATE
            SET answer = EXCLUDED.answer, file_url = EXCLUDED.file_url, submitted_at = now()
            WHERE assignment_submissions.reviewed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(lesson_id)
        .bind(user_id)
        .bind(data.answer.trim())
        .bind(&data.file_url)
        .fetch_optional(mm.executor())
        .await?;

        row.ok_or(DatabaseError::Conflict("reviewed assignment"))
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM assignment_submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn find_for_user(
        mm: &ModelManager,
        lesson_id: Uuid,
        user_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM assignment_submissions WHERE lesson_id = $1 AND user_id = $2")
            .bind(lesson_id)
            .bind(user_id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn all_by_lesson(mm: &ModelManager, lesson_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM assignment_submissions WHERE lesson_id = $1 ORDER BY submitted_at",
        )
        .bind(lesson_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn record_review(
        mut self,
        mm: &ModelManager,
        reviewer_id: Uuid,
        data: AssignmentReview,
    ) -> DatabaseResult<Self> {
        if data.mark < 0.0 {
            return Err(DatabaseError::validation("mark must not be negative"));
        }

        let reviewed_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            UPDATE assignment_submissions
            SET mark = $1, review = $2, is_passed = $3, reviewed_by = $4, reviewed_at = now()
            WHERE id = $5
            RETURNING reviewed_at
            "#,
        )
        .bind(data.mark)
        .bind(&data.review)
        .bind(data.is_passed)
        .bind(reviewer_id)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await?;

        self.mark = Some(data.mark);
        self.review = Some(data.review);
        self.is_passed = Some(data.is_passed);
        self.reviewed_by = Some(reviewer_id);
        self.reviewed_at = Some(reviewed_at);
        Ok(self)
    }
}
