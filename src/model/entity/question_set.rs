use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::model::access::HasOwner;
use crate::model::{DatabaseError, DatabaseResult, ModelManager, ResourceType, ResourceTyped};
use crate::services::grading::ScoringRules;
use crate::web::AuthenticatedUser;

/// Scoring and scheduling parameters of an exam lesson or an assessment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuestionSet {
    id: Uuid,
    lesson_id: Option<Uuid>,
    assessment_id: Option<Uuid>,
    marks_per_question: f64,
    negative_marking: f64,
    pass_percentage: f64,
    allowed_retakes: i32,
    duration_minutes: i32,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
pub enum QuestionSetOwner {
    Lesson(Uuid),
    Assessment(Uuid),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuestionSetParams {
    pub marks_per_question: Option<f64>,
    pub negative_marking: Option<f64>,
    pub pass_percentage: Option<f64>,
    pub allowed_retakes: Option<i32>,
    pub duration_minutes: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// On update, drops the stored window before `start_time`/`end_time` apply.
    #[serde(default)]
    pub clear_window: bool,
}

impl QuestionSetParams {
    pub fn validate(&self) -> DatabaseResult<()> {
        if let Some(marks) = self.marks_per_question {
            if marks <= 0.0 {
                return Err(DatabaseError::validation("marks_per_question must be positive"));
            }
        }
        if let Some(negative) = self.negative_marking {
            if negative < 0.0 {
                return Err(DatabaseError::validation("negative_marking must not be negative"));
            }
        }
        if let Some(pass) = self.pass_percentage {
            if !(0.0..=100.0).contains(&pass) {
                return Err(DatabaseError::validation("pass_percentage must be within 0..=100"));
            }
        }
        if let Some(retakes) = self.allowed_retakes {
            if retakes < 0 {
                return Err(DatabaseError::validation("allowed_retakes must not be negative"));
            }
        }
        if let Some(duration) = self.duration_minutes {
            if duration <= 0 {
                return Err(DatabaseError::validation("duration_minutes must be positive"));
            }
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if end <= start {
                return Err(DatabaseError::validation("end_time must be after start_time"));
            }
        }
        Ok(())
    }
}

impl ResourceTyped for QuestionSet {
    fn get_resource_type() -> ResourceType {
        ResourceType::QuestionSet
    }
}

impl QuestionSet {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn lesson_id(&self) -> Option<Uuid> {
        self.lesson_id
    }

    pub fn assessment_id(&self) -> Option<Uuid> {
        self.assessment_id
    }

    pub fn allowed_retakes(&self) -> i32 {
        self.allowed_retakes
    }

    pub fn duration_minutes(&self) -> i32 {
        self.duration_minutes
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn scoring_rules(&self) -> ScoringRules {
        ScoringRules {
            marks_per_question: self.marks_per_question,
            negative_marking: self.negative_marking,
            pass_percentage: self.pass_percentage,
        }
    }

    /// Whether `now` lies inside the optional availability window.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.start_time.is_none_or(|start| now >= start) && self.end_time.is_none_or(|end| now <= end)
    }

    pub async fn create_in(
        tx: &mut Transaction<'static, Postgres>,
        owner: QuestionSetOwner,
        params: &QuestionSetParams,
    ) -> DatabaseResult<Self> {
        params.validate()?;
        let (lesson_id, assessment_id) = match owner {
            QuestionSetOwner::Lesson(id) => (Some(id), None),
            QuestionSetOwner::Assessment(id) => (None, Some(id)),
        };

        let row = sqlx::query_as(
            r#"
            INSERT INTO question_sets (
                id, lesson_id, assessment_id, marks_per_question, negative_marking,
                pass_percentage, allowed_retakes, duration_minutes, start_time, end_time
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(lesson_id)
        .bind(assessment_id)
        .bind(params.marks_per_question.unwrap_or(1.0))
        .bind(params.negative_marking.unwrap_or(0.0))
        .bind(params.pass_percentage.unwrap_or(40.0))
        .bind(params.allowed_retakes.unwrap_or(0))
        .bind(params.duration_minutes.unwrap_or(30))
        .bind(params.start_time)
        .bind(params.end_time)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    /// Applies `params` on top of the stored values and validates the merged window.
    fn patched(&self, params: &QuestionSetParams) -> DatabaseResult<Self> {
        params.validate()?;
        let (start_time, end_time) = if params.clear_window {
            (params.start_time, params.end_time)
        } else {
            (params.start_time.or(self.start_time), params.end_time.or(self.end_time))
        };
        if let (Some(start), Some(end)) = (start_time, end_time) {
            if end <= start {
                return Err(DatabaseError::validation("end_time must be after start_time"));
            }
        }

        Ok(Self {
            marks_per_question: params.marks_per_question.unwrap_or(self.marks_per_question),
            negative_marking: params.negative_marking.unwrap_or(self.negative_marking),
            pass_percentage: params.pass_percentage.unwrap_or(self.pass_percentage),
            allowed_retakes: params.allowed_retakes.unwrap_or(self.allowed_retakes),
            duration_minutes: params.duration_minutes.unwrap_or(self.duration_minutes),
            start_time,
            end_time,
            ..self.clone()
        })
    }

    pub async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        params: QuestionSetParams,
    ) -> DatabaseResult<Self> {
        let updated = self.patched(&params)?;
        sqlx::query(
            r#"
            UPDATE question_sets
            SET marks_per_question = $1, negative_marking = $2, pass_percentage = $3,
                allowed_retakes = $4, duration_minutes = $5, start_time = $6, end_time = $7
            WHERE id = $8
            "#,
        )
        .bind(updated.marks_per_question)
        .bind(updated.negative_marking)
        .bind(updated.pass_percentage)
        .bind(updated.allowed_retakes)
        .bind(updated.duration_minutes)
        .bind(updated.start_time)
        .bind(updated.end_time)
        .bind(updated.id)
        .execute(mm.executor())
        .await?;

        Ok(updated)
    }

    pub async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM question_sets WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn find_by_owner(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        owner: QuestionSetOwner,
    ) -> DatabaseResult<Option<Self>> {
        let query = match owner {
            QuestionSetOwner::Lesson(id) => {
                sqlx::query_as("SELECT * FROM question_sets WHERE lesson_id = $1").bind(id)
            }
            QuestionSetOwner::Assessment(id) => {
                sqlx::query_as("SELECT * FROM question_sets WHERE assessment_id = $1").bind(id)
            }
        };
        Ok(query.fetch_optional(mm.executor()).await?)
    }
}

#[async_trait]
impl HasOwner for QuestionSet {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let author: Uuid = sqlx::query_scalar(
            r#"
            SELECT COALESCE(
                (SELECT c.author_id FROM lessons l JOIN courses c ON c.id = l.course_id WHERE l.id = $1),
                (SELECT a.author_id FROM assessments a WHERE a.id = $2)
            )
            "#,
        )
        .bind(self.lesson_id)
        .bind(self.assessment_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(author)
    }
}
