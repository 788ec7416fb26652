use serde::Serialize;

use crate::model::entity::DashboardCounts;

#[derive(Serialize, utoipa::ToSchema)]
pub struct DashboardResponse {
    #[serde(flatten)]
    counts: DashboardCounts,
    passed_exams: i64,
}

impl DashboardResponse {
    pub fn new(counts: DashboardCounts, passed_exams: i64) -> Self {
        Self { counts, passed_exams }
    }
}
