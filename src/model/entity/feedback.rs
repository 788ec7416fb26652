use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::{DatabaseError, DatabaseResult, ModelManager, ResourceType, ResourceTyped};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Rating,
    Subjective,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::Subjective => "subjective",
        }
    }
}

impl From<&str> for FeedbackType {
    fn from(value: &str) -> Self {
        match value {
            "rating" => Self::Rating,
            _ => Self::Subjective,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Feedback {
    id: Uuid,
    lesson_id: Uuid,
    question: String,
    feedback_type: String,
    order_index: i32,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct FeedbackCreate {
    pub question: String,
    pub feedback_type: FeedbackType,
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct FeedbackAnswer {
    pub feedback_id: Uuid,
    pub answer: Option<String>,
    pub rating: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct FeedbackSubmission {
    id: Uuid,
    feedback_id: Uuid,
    user_id: Uuid,
    answer: Option<String>,
    rating: Option<i32>,
    submitted_at: DateTime<Utc>,
}

impl ResourceTyped for Feedback {
    fn get_resource_type() -> ResourceType {
        ResourceType::Feedback
    }
}

impl Feedback {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn lesson_id(&self) -> Uuid {
        self.lesson_id
    }

    pub fn feedback_type(&self) -> FeedbackType {
        FeedbackType::from(self.feedback_type.as_str())
    }

    /// Checks a single answer against the question kind.
    pub fn check_answer(&self, answer: &FeedbackAnswer) -> DatabaseResult<()> {
        match self.feedback_type() {
            FeedbackType::Rating => match answer.rating {
                Some(rating) if (1..=5).contains(&rating) => Ok(()),
                _ => Err(DatabaseError::validation("rating must be between 1 and 5")),
            },
            FeedbackType::Subjective => match answer.answer.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => Ok(()),
                _ => Err(DatabaseError::validation("answer must not be empty")),
            },
        }
    }

    pub async fn create(mm: &ModelManager, lesson_id: Uuid, data: FeedbackCreate) -> DatabaseResult<Self> {
        if data.question.trim().is_empty() {
            return Err(DatabaseError::validation("question must not be empty"));
        }
        let row = sqlx::query_as(
            r#"
            INSERT INTO feedbacks (id, lesson_id, question, feedback_type, order_index)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(lesson_id)
        .bind(data.question.trim())
        .bind(data.feedback_type.as_str())
        .bind(data.order_index.unwrap_or(0))
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    pub async fn delete(self, mm: &ModelManager) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM feedbacks WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    pub async fn find_by_id(mm: &ModelManager, id: Uuid) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM feedbacks WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn all_by_lesson(mm: &ModelManager, lesson_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM feedbacks WHERE lesson_id = $1 ORDER BY order_index, question")
            .bind(lesson_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }
}

impl FeedbackSubmission {
    /// Stores all answers of one learner for a lesson, replacing earlier ones.
    pub async fn submit_all(
        mm: &ModelManager,
        user_id: Uuid,
        answers: &[FeedbackAnswer],
    ) -> DatabaseResult<Vec<Self>> {
        let mut tx = mm.begin().await?;
        let mut stored = Vec::with_capacity(answers.len());

        for answer in answers {
            let row = sqlx::query_as(
                r#"
                INSERT INTO feedback_submissions (id, feedback_id, user_id, answer, rating, submitted_at)
                VALUES ($1, $2, $3, $4, $5, now())
                ON CONFLICT (feedback_id, user_id) DO UPDATE
                SET answer = EXCLUDED.answer, rating = EXCLUDED.rating, submitted_at = now()
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(answer.feedback_id)
            .bind(user_id)
            .bind(answer.answer.as_deref().map(str::trim))
            .bind(answer.rating)
            .fetch_one(&mut *tx)
            .await?;
            stored.push(row);
        }

        tx.commit().await?;
        Ok(stored)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn feedback(feedback_type: FeedbackType) -> Feedback {
        Feedback {
            id: Uuid::new_v4(),
            lesson_id: Uuid::new_v4(),
            question: String::from("How was it?"),
            feedback_type: feedback_type.as_str().to_string(),
            order_index: 0,
        }
    }

    fn answer(text: Option<&str>, rating: Option<i32>) -> FeedbackAnswer {
        FeedbackAnswer {
            feedback_id: Uuid::new_v4(),
            answer: text.map(String::from),
            rating,
        }
    }

    #[test]
    fn rating_must_be_in_range() {
        let f = feedback(FeedbackType::Rating);
        assert!(f.check_answer(&answer(None, Some(1))).is_ok());
        assert!(f.check_answer(&answer(None, Some(5))).is_ok());
        assert!(f.check_answer(&answer(None, Some(0))).is_err());
        assert!(f.check_answer(&answer(None, Some(6))).is_err());
        assert!(f.check_answer(&answer(Some("great"), None)).is_err());
    }

    #[test]
    fn subjective_needs_text() {
        let f = feedback(FeedbackType::Subjective);
        assert!(f.check_answer(&answer(Some("clear slides"), None)).is_ok());
        assert!(f.check_answer(&answer(Some("   "), None)).is_err());
        assert!(f.check_answer(&answer(None, Some(4))).is_err());
    }
}
