use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{DatabaseResult, ModelManager, ResourceType, ResourceTyped};

/// Attendance record written each time a learner joins a live class.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct MeetingReport {
    id: Uuid,
    lesson_id: Uuid,
    user_id: Uuid,
    joined_at: DateTime<Utc>,
}

impl ResourceTyped for MeetingReport {
    fn get_resource_type() -> ResourceType {
        ResourceType::MeetingReport
    }
}

impl MeetingReport {
    pub async fn record(mm: &ModelManager, lesson_id: Uuid, user_id: Uuid) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "INSERT INTO meeting_reports (id, lesson_id, user_id, joined_at) VALUES ($1, $2, $3, now()) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(lesson_id)
        .bind(user_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    pub async fn all_by_lesson(mm: &ModelManager, lesson_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM meeting_reports WHERE lesson_id = $1 ORDER BY joined_at")
            .bind(lesson_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }
}
