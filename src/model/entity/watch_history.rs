use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{DatabaseResult, ModelManager, ResourceType, ResourceTyped};

/// Per learner and lesson progress record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct WatchHistory {
    id: Uuid,
    course_id: Uuid,
    lesson_id: Uuid,
    user_id: Uuid,
    is_completed: bool,
    is_passed: bool,
    updated_at: DateTime<Utc>,
}

impl ResourceTyped for WatchHistory {
    fn get_resource_type() -> ResourceType {
        ResourceType::WatchHistory
    }
}

impl WatchHistory {
    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn is_passed(&self) -> bool {
        self.is_passed
    }

    /// Marks the lesson completed for the user. A pass is kept once recorded,
    /// later failed attempts or plain completions do not clear it.
    pub async fn complete(
        mm: &ModelManager,
        user_id: Uuid,
        course_id: Uuid,
        lesson_id: Uuid,
        passed: Option<bool>,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO watch_histories (id, course_id, lesson_id, user_id, is_completed, is_passed, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, COALESCE($5, FALSE), now())
            ON CONFLICT (lesson_id, user_id) DO UPDATE
            SET is_completed = TRUE,
                is_passed = watch_histories.is_passed OR COALESCE($5, FALSE),
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(lesson_id)
        .bind(user_id)
        .bind(passed)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    pub async fn find(
        mm: &ModelManager,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM watch_histories WHERE user_id = $1 AND lesson_id = $2")
            .bind(user_id)
            .bind(lesson_id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn count_completed(
        mm: &ModelManager,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM watch_histories wh
            JOIN lessons l ON l.id = wh.lesson_id
            WHERE wh.user_id = $1 AND l.course_id = $2 AND wh.is_completed
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(count)
    }
}
