use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{DatabaseError, DatabaseResult, ModelManager, ResourceType, ResourceTyped};
use crate::services::grading::GradeOutcome;

/// One attempt of a learner at a question set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuestionSetSubmission {
    id: Uuid,
    question_set_id: Uuid,
    user_id: Uuid,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    total_marks: f64,
    obtained_marks: f64,
    negative_marks: f64,
    percentage: f64,
    passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct SubmissionAnswer {
    pub submission_id: Uuid,
    pub question_id: Uuid,
    pub selected_option_ids: Vec<Uuid>,
    pub is_correct: bool,
}

impl ResourceTyped for QuestionSetSubmission {
    fn get_resource_type() -> ResourceType {
        ResourceType::Submission
    }
}

impl QuestionSetSubmission {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn question_set_id(&self) -> Uuid {
        self.question_set_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub async fn start(
        mm: &ModelManager,
        question_set_id: Uuid,
        user_id: Uuid,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO question_set_submissions (id, question_set_id, user_id, started_at)
            VALUES ($1, $2, $3, now())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(question_set_id)
        .bind(user_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    /// Attempts started so far, submitted or not.
    pub async fn count_attempts(
        mm: &ModelManager,
        question_set_id: Uuid,
        user_id: Uuid,
    ) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM question_set_submissions WHERE question_set_id = $1 AND user_id = $2",
        )
        .bind(question_set_id)
        .bind(user_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(count)
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM question_set_submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn all_for_user(
        mm: &ModelManager,
        question_set_id: Uuid,
        user_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            r#"
            SELECT * FROM question_set_submissions
            WHERE question_set_id = $1 AND user_id = $2
            ORDER BY started_at
            "#,
        )
        .bind(question_set_id)
        .bind(user_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    /// Stores the graded answers and closes the attempt. An attempt that was
    /// already submitted is left untouched and reported as a conflict.
    pub async fn finish(mut self, mm: &ModelManager, outcome: &GradeOutcome) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;

        let closed = sqlx::query(
            r#"
            UPDATE question_set_submissions
            SET submitted_at = now(), total_marks = $1, obtained_marks = $2,
                negative_marks = $3, percentage = $4, passed = $5
            WHERE id = $6 AND submitted_at IS NULL
            "#,
        )
        .bind(outcome.total_marks)
        .bind(outcome.obtained_marks)
        .bind(outcome.negative_marks)
        .bind(outcome.percentage)
        .bind(outcome.passed)
        .bind(self.id)
        .execute(&mut *tx)
        .await?;

        if closed.rows_affected() == 0 {
            return Err(DatabaseError::Conflict("submission"));
        }

        for answer in &outcome.answers {
            sqlx::query(
                r#"
                INSERT INTO question_set_answers (submission_id, question_id, selected_option_ids, is_correct)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(self.id)
            .bind(answer.question_id)
            .bind(&answer.selected_option_ids)
            .bind(answer.is_correct)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.submitted_at = Some(Utc::now());
        self.total_marks = outcome.total_marks;
        self.obtained_marks = outcome.obtained_marks;
        self.negative_marks = outcome.negative_marks;
        self.percentage = outcome.percentage;
        self.passed = outcome.passed;
        Ok(self)
    }

    pub async fn answers(&self, mm: &ModelManager) -> DatabaseResult<Vec<SubmissionAnswer>> {
        let result = sqlx::query_as(
            "SELECT * FROM question_set_answers WHERE submission_id = $1",
        )
        .bind(self.id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    /// Passed exam attempts of a user, counted once per question set.
    pub async fn count_passed_for_user(mm: &ModelManager, user_id: Uuid) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT question_set_id) FROM question_set_submissions WHERE user_id = $1 AND passed",
        )
        .bind(user_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(count)
    }
}
