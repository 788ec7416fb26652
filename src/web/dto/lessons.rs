use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{FeedbackAnswer, Lesson, LessonCreate, QuestionSetParams};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LessonCreateBody {
    #[serde(flatten)]
    pub lesson: LessonCreate,
    /// Scoring parameters, used by exam lessons only.
    #[serde(default)]
    pub question_set: Option<QuestionSetParams>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LessonDetailResponse {
    #[serde(flatten)]
    lesson: Lesson,
    question_set_id: Option<Uuid>,
}

impl LessonDetailResponse {
    pub fn new(lesson: Lesson, question_set_id: Option<Uuid>) -> Self {
        Self {
            lesson,
            question_set_id,
        }
    }

    pub fn course_id(&self) -> Uuid {
        self.lesson.course_id()
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct StatusQuery {
    /// `en` or `es`, anything else falls back to `en`
    pub locale: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct FeedbackSubmitBody {
    pub answers: Vec<FeedbackAnswer>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JoinResponse {
    pub join_url: String,
}
