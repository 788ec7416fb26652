use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{Question, QuestionSetSubmission, QuestionType, SubmissionAnswer};
use crate::services::grading::AnswerSelection;

/// Option as shown while the attempt is running, without correctness.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LearnerOption {
    id: Uuid,
    option_text: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LearnerQuestion {
    id: Uuid,
    text: String,
    question_type: QuestionType,
    order_index: i32,
    options: Vec<LearnerOption>,
}

impl From<&Question> for LearnerQuestion {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id(),
            text: question.text().to_string(),
            question_type: question.question_type(),
            order_index: question.order_index(),
            options: question
                .options()
                .iter()
                .map(|o| LearnerOption {
                    id: o.id,
                    option_text: o.option_text.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AttemptResponse {
    submission: QuestionSetSubmission,
    questions: Vec<LearnerQuestion>,
}

impl AttemptResponse {
    pub fn new(submission: QuestionSetSubmission, questions: &[Question]) -> Self {
        Self {
            submission,
            questions: questions.iter().map(LearnerQuestion::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SubmitBody {
    pub submission_id: Uuid,
    #[serde(default)]
    pub answers: Vec<AnswerSelection>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmissionResult {
    #[serde(flatten)]
    submission: QuestionSetSubmission,
    answers: Vec<SubmissionAnswer>,
}

impl SubmissionResult {
    pub fn new(submission: QuestionSetSubmission, answers: Vec<SubmissionAnswer>) -> Self {
        Self { submission, answers }
    }
}
