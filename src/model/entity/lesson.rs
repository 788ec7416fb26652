use crate::model::access::HasOwner;
use crate::model::entity::{QuestionSet, QuestionSetOwner, QuestionSetParams};
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::prelude::FromRow;
use sqlx::query::QueryAs;
use sqlx::Postgres;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    Video,
    Document,
    Exam,
    Assignment,
    LiveClass,
    Feedback,
}

impl LessonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Document => "document",
            Self::Exam => "exam",
            Self::Assignment => "assignment",
            Self::LiveClass => "live_class",
            Self::Feedback => "feedback",
        }
    }

    /// Lessons a learner completes by simply marking them done.
    pub fn is_self_paced(&self) -> bool {
        matches!(self, Self::Video | Self::Document | Self::LiveClass)
    }
}

impl TryFrom<&str> for LessonType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "video" => Ok(Self::Video),
            "document" => Ok(Self::Document),
            "exam" => Ok(Self::Exam),
            "assignment" => Ok(Self::Assignment),
            "live_class" => Ok(Self::LiveClass),
            "feedback" => Ok(Self::Feedback),
            other => Err(format!("unknown lesson type `{other}`")),
        }
    }
}

impl std::fmt::Display for LessonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Lesson {
    id: Uuid,
    course_id: Uuid,
    section_id: Uuid,
    title: String,
    description: String,
    lesson_type: String,
    order_index: i32,
    is_mandatory: bool,
    content_url: Option<String>,
    duration_seconds: i32,
    start_date: Option<DateTime<Utc>>,
    meeting_id: Option<String>,
    join_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl ResourceTyped for Lesson {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Lesson
    }
}

impl Lesson {
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn course_id(&self) -> uuid::Uuid {
        self.course_id
    }

    pub fn section_id(&self) -> uuid::Uuid {
        self.section_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Rows are only written through [`LessonType`], unknown values read as documents.
    pub fn lesson_type(&self) -> LessonType {
        LessonType::try_from(self.lesson_type.as_str()).unwrap_or(LessonType::Document)
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    pub fn is_mandatory(&self) -> bool {
        self.is_mandatory
    }

    pub fn content_url(&self) -> Option<&str> {
        self.content_url.as_deref()
    }

    pub fn duration_seconds(&self) -> i32 {
        self.duration_seconds
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    pub fn meeting_id(&self) -> Option<&str> {
        self.meeting_id.as_deref()
    }

    pub fn join_url(&self) -> Option<&str> {
        self.join_url.as_deref()
    }
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LessonCreate {
    pub section_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub lesson_type: LessonType,
    pub order_index: Option<i32>,
    pub is_mandatory: Option<bool>,
    pub content_url: Option<String>,
    pub duration_seconds: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
}

const INSERT_LESSON: &str = r#"
    INSERT INTO lessons (
        id, course_id, section_id, title, description, lesson_type, order_index,
        is_mandatory, content_url, duration_seconds, start_date
    )
    VALUES ($1, (SELECT course_id FROM sections WHERE id = $2), $2, $3, $4, $5, $6, $7, $8, $9, $10)
    RETURNING *
"#;

fn insert_query(data: &LessonCreate) -> QueryAs<'_, Postgres, Lesson, PgArguments> {
    sqlx::query_as(INSERT_LESSON)
        .bind(Uuid::new_v4())
        .bind(data.section_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.lesson_type.as_str())
        .bind(data.order_index.unwrap_or(0))
        .bind(data.is_mandatory.unwrap_or(true))
        .bind(&data.content_url)
        .bind(data.duration_seconds.unwrap_or(0))
        .bind(data.start_date)
}

#[async_trait]
impl CrudRepository<Lesson, LessonCreate, uuid::Uuid> for Lesson {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        let lesson = insert_query(&data).fetch_one(mm.executor()).await?;
        Ok(lesson)
    }

    /// The lesson type is fixed at creation, `lesson_type` of `data` is ignored.
    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCreate,
    ) -> DatabaseResult<Self> {
        let order_index = data.order_index.unwrap_or(self.order_index);
        let is_mandatory = data.is_mandatory.unwrap_or(self.is_mandatory);
        let duration_seconds = data.duration_seconds.unwrap_or(self.duration_seconds);

        sqlx::query(
            r#"
            UPDATE lessons
            SET section_id = $1, title = $2, description = $3, order_index = $4,
                is_mandatory = $5, content_url = $6, duration_seconds = $7, start_date = $8
            WHERE id = $9
            "#,
        )
        .bind(data.section_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(order_index)
        .bind(is_mandatory)
        .bind(&data.content_url)
        .bind(duration_seconds)
        .bind(data.start_date)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.section_id = data.section_id;
        self.title = data.title;
        self.description = data.description;
        self.order_index = order_index;
        self.is_mandatory = is_mandatory;
        self.content_url = data.content_url;
        self.duration_seconds = duration_seconds;
        self.start_date = data.start_date;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: uuid::Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM lessons WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM lessons ORDER BY course_id, order_index LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl Lesson {
    /// Writes an exam lesson and its question set in one transaction.
    pub async fn create_exam(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: LessonCreate,
        params: &QuestionSetParams,
    ) -> DatabaseResult<(Self, QuestionSet)> {
        params.validate()?;
        let mut tx = mm.begin().await?;

        let lesson: Self = insert_query(&data).fetch_one(&mut *tx).await?;
        let question_set = QuestionSet::create_in(&mut tx, QuestionSetOwner::Lesson(lesson.id), params).await?;

        tx.commit().await?;
        tracing::debug!(lesson_id = %lesson.id, question_set_id = %question_set.id(), "exam lesson created");
        Ok((lesson, question_set))
    }

    pub async fn set_meeting(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        meeting_id: String,
        join_url: String,
    ) -> DatabaseResult<Self> {
        sqlx::query("UPDATE lessons SET meeting_id = $1, join_url = $2 WHERE id = $3")
            .bind(&meeting_id)
            .bind(&join_url)
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        self.meeting_id = Some(meeting_id);
        self.join_url = Some(join_url);
        Ok(self)
    }
}

#[async_trait]
impl HasOwner for Lesson {
    type OwnerId = uuid::Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let author: Uuid = sqlx::query_scalar("SELECT author_id FROM courses WHERE id = $1")
            .bind(self.course_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(author)
    }
}

// Utils

/// Lesson outline row joined with the learner's watch history.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct LessonWithProgressRow {
    pub id: Uuid,
    pub section_id: Uuid,
    pub title: String,
    pub lesson_type: String,
    pub order_index: i32,
    pub is_mandatory: bool,
    pub is_completed: Option<bool>,
    pub is_passed: Option<bool>,
}

impl LessonWithProgressRow {
    pub async fn all_by_course(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        course_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
                l.id,
                l.section_id,
                l.title,
                l.lesson_type,
                l.order_index,
                l.is_mandatory,
                wh.is_completed,
                wh.is_passed
            FROM lessons l
            JOIN sections s ON s.id = l.section_id
            LEFT JOIN watch_histories wh
                ON wh.lesson_id = l.id AND wh.user_id = $2
            WHERE l.course_id = $1
            ORDER BY s.order_index, l.order_index, l.created_at
            "#,
        )
        .bind(course_id)
        .bind(actor.user_id())
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }

    /// First lesson of the course, in outline order, the learner has not completed.
    pub async fn find_next_uncompleted(
        mm: &ModelManager,
        user_id: Uuid,
        course_id: Uuid,
    ) -> DatabaseResult<Option<Uuid>> {
        let id = sqlx::query_scalar(
            r#"
            SELECT l.id
            FROM lessons l
            JOIN sections s ON s.id = l.section_id
            LEFT JOIN watch_histories wh
                ON wh.lesson_id = l.id AND wh.user_id = $2
            WHERE l.course_id = $1
              AND COALESCE(wh.is_completed, FALSE) = FALSE
            ORDER BY s.order_index, l.order_index, l.created_at
            LIMIT 1
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_optional(mm.executor())
        .await?;

        Ok(id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lesson_type_strings_roundtrip() {
        for t in [
            LessonType::Video,
            LessonType::Document,
            LessonType::Exam,
            LessonType::Assignment,
            LessonType::LiveClass,
            LessonType::Feedback,
        ] {
            assert_eq!(LessonType::try_from(t.as_str()), Ok(t));
        }
        assert!(LessonType::try_from("podcast").is_err());
    }

    #[test]
    fn serde_names_match_column_values() {
        let json = serde_json::to_string(&LessonType::LiveClass).unwrap();
        assert_eq!(json, "\"live_class\"");
    }

    #[test]
    fn only_plain_content_is_self_paced() {
        assert!(LessonType::Video.is_self_paced());
        assert!(LessonType::LiveClass.is_self_paced());
        assert!(!LessonType::Exam.is_self_paced());
        assert!(!LessonType::Assignment.is_self_paced());
        assert!(!LessonType::Feedback.is_self_paced());
    }
}
