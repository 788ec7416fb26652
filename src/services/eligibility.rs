//! Assessment eligibility and skill rules.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::web::UserRole;

/// A single eligibility condition of an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "criteria_type", rename_all = "snake_case")]
pub enum Criterion {
    Role { role: UserRole },
    Department { department_id: Uuid },
    Group { group_id: Uuid },
    /// The learner completed the course.
    Training { course_id: Uuid },
    Skill { skill_id: Uuid, threshold: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CriterionKind {
    Role,
    Department,
    Group,
    Training,
    Skill,
}

impl Criterion {
    fn kind(&self) -> CriterionKind {
        match self {
            Self::Role { .. } => CriterionKind::Role,
            Self::Department { .. } => CriterionKind::Department,
            Self::Group { .. } => CriterionKind::Group,
            Self::Training { .. } => CriterionKind::Training,
            Self::Skill { .. } => CriterionKind::Skill,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind() {
            CriterionKind::Role => "role",
            CriterionKind::Department => "department",
            CriterionKind::Group => "group",
            CriterionKind::Training => "training",
            CriterionKind::Skill => "skill",
        }
    }

    pub fn is_met_by(&self, learner: &LearnerProfile) -> bool {
        match self {
            Self::Role { role } => learner.role == *role,
            Self::Department { department_id } => learner.department_id == Some(*department_id),
            Self::Group { group_id } => learner.group_ids.contains(group_id),
            Self::Training { course_id } => learner.completed_course_ids.contains(course_id),
            Self::Skill { skill_id, threshold } => learner
                .skill_scores
                .get(skill_id)
                .is_some_and(|score| score >= threshold),
        }
    }
}

/// Everything eligibility is decided on.
#[derive(Debug, Clone)]
pub struct LearnerProfile {
    pub role: UserRole,
    pub department_id: Option<Uuid>,
    pub group_ids: HashSet<Uuid>,
    pub completed_course_ids: HashSet<Uuid>,
    pub skill_scores: HashMap<Uuid, f64>,
}

/// No criteria means everybody is eligible. Criteria of the same kind are
/// alternatives, every kind present must be satisfied.
pub fn is_eligible(criteria: &[Criterion], learner: &LearnerProfile) -> bool {
    let mut by_kind: HashMap<CriterionKind, bool> = HashMap::new();
    for criterion in criteria {
        let met = by_kind.entry(criterion.kind()).or_insert(false);
        *met = *met || criterion.is_met_by(learner);
    }
    by_kind.values().all(|met| *met)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkillRule {
    GreaterThan,
    LessThan,
}

impl SkillRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
        }
    }

    /// Whether an assessment `percentage` triggers the rule for `threshold`.
    pub fn applies(&self, threshold: f64, percentage: f64) -> bool {
        match self {
            Self::GreaterThan => percentage > threshold,
            Self::LessThan => percentage < threshold,
        }
    }
}

impl From<&str> for SkillRule {
    fn from(value: &str) -> Self {
        match value {
            "less_than" => Self::LessThan,
            _ => Self::GreaterThan,
        }
    }
}
