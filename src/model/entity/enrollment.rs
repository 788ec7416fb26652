use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::entity::{LessonWithProgressRow, WatchHistory};
use crate::model::{DatabaseError, DatabaseResult, ModelManager, ResourceType, ResourceTyped};
use crate::services::progress;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct CourseEnrollment {
    id: Uuid,
    course_id: Uuid,
    user_id: Uuid,
    enrolled_at: DateTime<Utc>,
    percentage: i32,
    current_lesson_id: Option<Uuid>,
    certificate_number: Option<String>,
    certificate_issued_at: Option<DateTime<Utc>>,
}

/// Enrollment joined with the learner's name, for course authors.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct EnrollmentWithUserRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub enrolled_at: DateTime<Utc>,
    pub percentage: i32,
    pub certificate_number: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct DashboardCounts {
    pub enrolled_courses: i64,
    pub completed_courses: i64,
    pub certificates: i64,
}

impl ResourceTyped for CourseEnrollment {
    fn get_resource_type() -> ResourceType {
        ResourceType::Enrollment
    }
}

impl CourseEnrollment {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn percentage(&self) -> i32 {
        self.percentage
    }

    pub fn current_lesson_id(&self) -> Option<Uuid> {
        self.current_lesson_id
    }

    pub fn certificate_number(&self) -> Option<&str> {
        self.certificate_number.as_deref()
    }

    pub async fn enroll(mm: &ModelManager, course_id: Uuid, user_id: Uuid) -> DatabaseResult<Self> {
        let current_lesson_id = LessonWithProgressRow::find_next_uncompleted(mm, user_id, course_id).await?;
        let row = sqlx::query_as(
            r#"
            INSERT INTO course_enrollments (id, course_id, user_id, current_lesson_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(user_id)
        .bind(current_lesson_id)
        .fetch_one(mm.executor())
        .await
        .map_err(|e| DatabaseError::unique_as_conflict(e, "enrollment"))?;
        Ok(row)
    }

    pub async fn find(mm: &ModelManager, course_id: Uuid, user_id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM course_enrollments WHERE course_id = $1 AND user_id = $2")
            .bind(course_id)
            .bind(user_id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn is_enrolled(mm: &ModelManager, course_id: Uuid, user_id: Uuid) -> DatabaseResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM course_enrollments WHERE course_id = $1 AND user_id = $2)",
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(exists)
    }

    /// Recomputes percentage and current lesson from the watch history.
    /// Does nothing for users that are not enrolled.
    pub async fn refresh_progress(
        mm: &ModelManager,
        course_id: Uuid,
        user_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(mm.executor())
            .await?;
        let completed = WatchHistory::count_completed(mm, user_id, course_id).await?;
        let percentage = progress::enrollment_percentage(completed, total);
        let current_lesson_id = LessonWithProgressRow::find_next_uncompleted(mm, user_id, course_id).await?;

        let row: Option<Self> = sqlx::query_as(
            r#"
            UPDATE course_enrollments
            SET percentage = $1, current_lesson_id = $2
            WHERE course_id = $3 AND user_id = $4
            RETURNING *
            "#,
        )
        .bind(percentage)
        .bind(current_lesson_id)
        .bind(course_id)
        .bind(user_id)
        .fetch_optional(mm.executor())
        .await?;

        if row.is_some() {
            tracing::debug!(%course_id, %user_id, percentage, "enrollment progress updated");
        }
        Ok(row)
    }

    /// Refreshes every enrollment of a course after its lessons changed.
    pub async fn refresh_course(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<()> {
        let user_ids: Vec<Uuid> = sqlx::query_scalar("SELECT user_id FROM course_enrollments WHERE course_id = $1")
            .bind(course_id)
            .fetch_all(mm.executor())
            .await?;
        for user_id in &user_ids {
            Self::refresh_progress(mm, course_id, *user_id).await?;
        }
        tracing::info!(%course_id, enrollments = user_ids.len(), "course progress refreshed");
        Ok(())
    }

    /// Marks a lesson completed and refreshes the enrollment it belongs to.
    pub async fn record_completion(
        mm: &ModelManager,
        user_id: Uuid,
        course_id: Uuid,
        lesson_id: Uuid,
        passed: Option<bool>,
    ) -> DatabaseResult<Option<Self>> {
        WatchHistory::complete(mm, user_id, course_id, lesson_id, passed).await?;
        Self::refresh_progress(mm, course_id, user_id).await
    }

    pub async fn all_by_course(mm: &ModelManager, course_id: Uuid) -> DatabaseResult<Vec<EnrollmentWithUserRow>> {
        let result = sqlx::query_as(
            r#"
            SELECT e.id, e.user_id, u.username, e.enrolled_at, e.percentage, e.certificate_number
            FROM course_enrollments e
            JOIN users u ON u.id = e.user_id
            WHERE e.course_id = $1
            ORDER BY e.enrolled_at
            "#,
        )
        .bind(course_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    pub async fn all_for_user(mm: &ModelManager, user_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM course_enrollments WHERE user_id = $1 ORDER BY enrolled_at DESC")
            .bind(user_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    /// Stores the certificate number once; a second call keeps the first one.
    pub async fn issue_certificate(mut self, mm: &ModelManager, number: String) -> DatabaseResult<Self> {
        if self.certificate_number.is_some() {
            return Ok(self);
        }
        let issued_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            UPDATE course_enrollments
            SET certificate_number = $1, certificate_issued_at = now()
            WHERE id = $2
            RETURNING certificate_issued_at
            "#,
        )
        .bind(&number)
        .bind(self.id)
        .fetch_one(mm.executor())
        .await
        .map_err(|e| DatabaseError::unique_as_conflict(e, "certificate number"))?;

        self.certificate_number = Some(number);
        self.certificate_issued_at = Some(issued_at);
        Ok(self)
    }

    pub async fn dashboard(mm: &ModelManager, user_id: Uuid) -> DatabaseResult<DashboardCounts> {
        let counts = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS enrolled_courses,
                COUNT(*) FILTER (WHERE percentage = 100) AS completed_courses,
                COUNT(certificate_number) AS certificates
            FROM course_enrollments
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(counts)
    }

    /// Courses the user finished, used by training criteria.
    pub async fn completed_course_ids(mm: &ModelManager, user_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar("SELECT course_id FROM course_enrollments WHERE user_id = $1 AND percentage = 100")
            .bind(user_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(ids)
    }
}
