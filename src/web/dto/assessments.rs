use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{Assessment, AssessmentCreate, QuestionSetParams};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AssessmentCreateBody {
    #[serde(flatten)]
    pub assessment: AssessmentCreate,
    #[serde(default)]
    pub question_set: QuestionSetParams,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AssessmentDetailResponse {
    #[serde(flatten)]
    assessment: Assessment,
    question_set_id: Option<Uuid>,
}

impl AssessmentDetailResponse {
    pub fn new(assessment: Assessment, question_set_id: Option<Uuid>) -> Self {
        Self {
            assessment,
            question_set_id,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EligibilityResponse {
    pub eligible: bool,
}
