use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::entity::{CourseEnrollment, UserSkill};
use crate::model::{DatabaseError, DatabaseResult, ModelManager, ResourceType, ResourceTyped};
use crate::services::eligibility::{Criterion, LearnerProfile, SkillRule};
use crate::web::{AuthenticatedUser, UserRole};

/// Stored eligibility condition. Only the columns of its `criteria_type` are set.
#[derive(Debug, Clone, FromRow)]
struct EligibilityCriteriaRow {
    id: Uuid,
    assessment_id: Uuid,
    criteria_type: String,
    role: Option<String>,
    department_id: Option<Uuid>,
    group_id: Option<Uuid>,
    course_id: Option<Uuid>,
    skill_id: Option<Uuid>,
    skill_threshold: Option<f64>,
}

impl EligibilityCriteriaRow {
    fn into_criterion(self) -> Option<Criterion> {
        let criterion = match self.criteria_type.as_str() {
            "role" => Criterion::Role {
                role: UserRole::from(self.role?.as_str()),
            },
            "department" => Criterion::Department {
                department_id: self.department_id?,
            },
            "group" => Criterion::Group {
                group_id: self.group_id?,
            },
            "training" => Criterion::Training {
                course_id: self.course_id?,
            },
            "skill" => Criterion::Skill {
                skill_id: self.skill_id?,
                threshold: self.skill_threshold?,
            },
            _ => return None,
        };
        Some(criterion)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EligibilityCriteria {
    pub id: Uuid,
    pub assessment_id: Uuid,
    #[serde(flatten)]
    pub criterion: Criterion,
}

impl ResourceTyped for EligibilityCriteria {
    fn get_resource_type() -> ResourceType {
        ResourceType::Eligibility
    }
}

impl EligibilityCriteria {
    pub async fn create(mm: &ModelManager, assessment_id: Uuid, criterion: Criterion) -> DatabaseResult<Self> {
        let (mut role, mut department_id, mut group_id, mut course_id, mut skill_id, mut threshold) =
            (None, None, None, None, None, None);
        match &criterion {
            Criterion::Role { role: r } => role = Some(r.to_string()),
            Criterion::Department { department_id: id } => department_id = Some(*id),
            Criterion::Group { group_id: id } => group_id = Some(*id),
            Criterion::Training { course_id: id } => course_id = Some(*id),
            Criterion::Skill { skill_id: id, threshold: t } => {
                if !(0.0..=100.0).contains(t) {
                    return Err(DatabaseError::validation("threshold must be within 0..=100"));
                }
                skill_id = Some(*id);
                threshold = Some(*t);
            }
        }

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO eligibility_criteria (
                id, assessment_id, criteria_type, role, department_id, group_id, course_id, skill_id, skill_threshold
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(assessment_id)
        .bind(criterion.kind_name())
        .bind(role)
        .bind(department_id)
        .bind(group_id)
        .bind(course_id)
        .bind(skill_id)
        .bind(threshold)
        .execute(mm.executor())
        .await?;

        Ok(Self {
            id,
            assessment_id,
            criterion,
        })
    }

    pub async fn all_by_assessment(mm: &ModelManager, assessment_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let rows: Vec<EligibilityCriteriaRow> =
            sqlx::query_as("SELECT * FROM eligibility_criteria WHERE assessment_id = $1")
                .bind(assessment_id)
                .fetch_all(mm.executor())
                .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let (id, assessment_id) = (row.id, row.assessment_id);
                match row.into_criterion() {
                    Some(criterion) => Some(Self {
                        id,
                        assessment_id,
                        criterion,
                    }),
                    None => {
                        tracing::warn!(%id, "skipping malformed eligibility criteria");
                        None
                    }
                }
            })
            .collect())
    }

    pub async fn delete(mm: &ModelManager, assessment_id: Uuid, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM eligibility_criteria WHERE id = $1 AND assessment_id = $2")
            .bind(id)
            .bind(assessment_id)
            .execute(mm.executor())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl LearnerProfile {
    /// Collects role, department, groups, completed courses and skills of the actor.
    pub async fn load(mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<Self> {
        let user_id = actor.user_id();

        let department_id: Option<Uuid> = sqlx::query_scalar("SELECT department_id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(mm.executor())
            .await?
            .flatten();

        let group_ids: Vec<Uuid> = sqlx::query_scalar("SELECT group_id FROM group_members WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(mm.executor())
            .await?;

        let completed_course_ids = CourseEnrollment::completed_course_ids(mm, user_id).await?;

        let skills = UserSkill::all_for_user(mm, user_id).await?;

        Ok(Self {
            role: actor.user_role(),
            department_id,
            group_ids: group_ids.into_iter().collect(),
            completed_course_ids: completed_course_ids.into_iter().collect(),
            skill_scores: skills.into_iter().map(|s| (s.skill_id, s.score)).collect(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct SkillsCriteria {
    id: Uuid,
    assessment_id: Uuid,
    skill_id: Uuid,
    rule: String,
    percentage: f64,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SkillsCriteriaCreate {
    pub skill_id: Uuid,
    pub rule: SkillRule,
    pub percentage: f64,
}

impl ResourceTyped for SkillsCriteria {
    fn get_resource_type() -> ResourceType {
        ResourceType::Eligibility
    }
}

impl SkillsCriteria {
    pub fn skill_id(&self) -> Uuid {
        self.skill_id
    }

    pub fn rule(&self) -> SkillRule {
        SkillRule::from(self.rule.as_str())
    }

    pub fn applies_to(&self, percentage: f64) -> bool {
        self.rule().applies(self.percentage, percentage)
    }

    pub async fn create(
        mm: &ModelManager,
        assessment_id: Uuid,
        data: SkillsCriteriaCreate,
    ) -> DatabaseResult<Self> {
        if !(0.0..=100.0).contains(&data.percentage) {
            return Err(DatabaseError::validation("percentage must be within 0..=100"));
        }
        let row = sqlx::query_as(
            r#"
            INSERT INTO skills_criteria (id, assessment_id, skill_id, rule, percentage)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(assessment_id)
        .bind(data.skill_id)
        .bind(data.rule.as_str())
        .bind(data.percentage)
        .fetch_one(mm.executor())
        .await?;
        Ok(row)
    }

    pub async fn all_by_assessment(mm: &ModelManager, assessment_id: Uuid) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM skills_criteria WHERE assessment_id = $1")
            .bind(assessment_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }
}
