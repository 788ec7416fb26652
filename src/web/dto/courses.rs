use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{Course, LessonType, LessonWithProgressRow, Section};

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LessonOutline {
    id: Uuid,
    title: String,
    lesson_type: LessonType,
    order_index: i32,
    is_mandatory: bool,
    is_completed: bool,
    is_passed: Option<bool>,
}

impl TryFrom<LessonWithProgressRow> for LessonOutline {
    type Error = String;

    fn try_from(row: LessonWithProgressRow) -> Result<Self, Self::Error> {
        let lesson_type = LessonType::try_from(row.lesson_type.as_str())
            .map_err(|_| format!("unknown lesson type `{}`", row.lesson_type))?;
        Ok(Self {
            id: row.id,
            title: row.title,
            lesson_type,
            order_index: row.order_index,
            is_mandatory: row.is_mandatory,
            is_completed: row.is_completed.unwrap_or(false),
            is_passed: row.is_passed,
        })
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SectionOutline {
    #[serde(flatten)]
    section: Section,
    lessons: Vec<LessonOutline>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseDetailResponse {
    #[serde(flatten)]
    course: Course,
    sections: Vec<SectionOutline>,
}

impl CourseDetailResponse {
    /// Groups lesson rows under their sections, keeping both orders as given.
    pub fn new(course: Course, sections: Vec<Section>, lessons: Vec<(Uuid, LessonOutline)>) -> Self {
        let sections = sections
            .into_iter()
            .map(|section| {
                let lessons = lessons
                    .iter()
                    .filter(|(section_id, _)| *section_id == section.id())
                    .map(|(_, lesson)| lesson.clone())
                    .collect();
                SectionOutline { section, lessons }
            })
            .collect();

        Self { course, sections }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SectionBody {
    pub title: String,
    pub order_index: Option<i32>,
}
