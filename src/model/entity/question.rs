use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::access::HasOwner;
use crate::model::entity::QuestionSet;
use crate::model::{DatabaseError, DatabaseResult, ModelManager, ResourceType, ResourceTyped};
use crate::services::grading::GradableQuestion;
use crate::web::AuthenticatedUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleChoice => "single_choice",
            Self::MultipleChoice => "multiple_choice",
        }
    }
}

impl From<&str> for QuestionType {
    fn from(value: &str) -> Self {
        match value {
            "multiple_choice" => Self::MultipleChoice,
            _ => Self::SingleChoice,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuestionOption {
    pub id: Uuid,
    pub option_text: String,
    pub is_correct: bool,
}

/// Question together with its options, aggregated in one query.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Question {
    id: Uuid,
    question_set_id: Uuid,
    text: String,
    question_type: QuestionType,
    order_index: i32,
    options: Vec<QuestionOption>,
}

#[derive(FromRow)]
struct QuestionRow {
    id: Uuid,
    question_set_id: Uuid,
    text: String,
    question_type: String,
    order_index: i32,
    options: serde_json::Value,
}

impl TryFrom<QuestionRow> for Question {
    type Error = serde_json::Error;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            question_set_id: row.question_set_id,
            text: row.text,
            question_type: QuestionType::from(row.question_type.as_str()),
            order_index: row.order_index,
            options: serde_json::from_value(row.options)?,
        })
    }
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuestionOptionCreate {
    pub option_text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuestionCreate {
    pub text: String,
    pub question_type: QuestionType,
    pub order_index: Option<i32>,
    pub options: Vec<QuestionOptionCreate>,
}

impl QuestionCreate {
    pub fn validate(&self) -> DatabaseResult<()> {
        if self.text.trim().is_empty() {
            return Err(DatabaseError::validation("question text must not be empty"));
        }
        if self.options.len() < 2 {
            return Err(DatabaseError::validation("at least two options are required"));
        }
        if self.options.iter().any(|o| o.option_text.trim().is_empty()) {
            return Err(DatabaseError::validation("option text must not be empty"));
        }
        let correct = self.options.iter().filter(|o| o.is_correct).count();
        match (self.question_type, correct) {
            (_, 0) => Err(DatabaseError::validation("at least one option must be correct")),
            (QuestionType::SingleChoice, n) if n > 1 => Err(DatabaseError::validation(
                "single choice questions have exactly one correct option",
            )),
            _ => Ok(()),
        }
    }
}

impl ResourceTyped for Question {
    fn get_resource_type() -> ResourceType {
        ResourceType::Question
    }
}

impl Question {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn question_set_id(&self) -> Uuid {
        self.question_set_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    pub fn options(&self) -> &[QuestionOption] {
        &self.options
    }

    pub fn to_gradable(&self) -> GradableQuestion {
        GradableQuestion {
            question_id: self.id,
            correct_option_ids: self
                .options
                .iter()
                .filter(|o| o.is_correct)
                .map(|o| o.id)
                .collect(),
        }
    }
}

const QUESTIONS_WITH_OPTIONS: &str = r#"
    SELECT
        q.id,
        q.question_set_id,
        q.text,
        q.question_type,
        q.order_index,
        COALESCE(
            json_agg(
                json_build_object(
                    'id', o.id,
                    'option_text', o.option_text,
                    'is_correct', o.is_correct
                ) ORDER BY o.option_text
            ) FILTER (WHERE o.id IS NOT NULL),
            '[]'
        ) AS options
    FROM questions q
    LEFT JOIN question_options o ON o.question_id = q.id
"#;

impl Question {
    pub async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        question_set_id: Uuid,
        data: QuestionCreate,
    ) -> DatabaseResult<Self> {
        data.validate()?;
        let mut tx = mm.begin().await?;

        let id = Uuid::new_v4();
        let order_index = data.order_index.unwrap_or(0);
        sqlx::query(
            "INSERT INTO questions (id, question_set_id, text, question_type, order_index) VALUES ($1,$2,$3,$4,$5)",
        )
        .bind(id)
        .bind(question_set_id)
        .bind(data.text.trim())
        .bind(data.question_type.as_str())
        .bind(order_index)
        .execute(&mut *tx)
        .await?;

        let mut options = Vec::with_capacity(data.options.len());
        for option in data.options {
            let option_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO question_options (id, question_id, option_text, is_correct) VALUES ($1,$2,$3,$4)",
            )
            .bind(option_id)
            .bind(id)
            .bind(option.option_text.trim())
            .bind(option.is_correct)
            .execute(&mut *tx)
            .await?;

            options.push(QuestionOption {
                id: option_id,
                option_text: option.option_text.trim().to_string(),
                is_correct: option.is_correct,
            });
        }

        tx.commit().await?;

        Ok(Self {
            id,
            question_set_id,
            text: data.text.trim().to_string(),
            question_type: data.question_type,
            order_index,
            options,
        })
    }

    pub async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    pub async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let query = format!("{QUESTIONS_WITH_OPTIONS} WHERE q.id = $1 GROUP BY q.id");
        let row: Option<QuestionRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(row.map(Question::try_from).transpose()?)
    }

    pub async fn all_by_question_set(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        question_set_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let query = format!(
            "{QUESTIONS_WITH_OPTIONS} WHERE q.question_set_id = $1 GROUP BY q.id ORDER BY q.order_index, q.text"
        );
        let rows: Vec<QuestionRow> = sqlx::query_as(&query)
            .bind(question_set_id)
            .fetch_all(mm.executor())
            .await?;

        Ok(rows
            .into_iter()
            .map(Question::try_from)
            .collect::<Result<_, _>>()?)
    }
}

#[async_trait]
impl HasOwner for Question {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let set = QuestionSet::find_by_id(mm, actor, self.question_set_id)
            .await?
            .ok_or(DatabaseError::SqlxError(sqlx::Error::RowNotFound))?;
        set.get_owner_id(mm, actor).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn option(text: &str, is_correct: bool) -> QuestionOptionCreate {
        QuestionOptionCreate {
            option_text: text.to_string(),
            is_correct,
        }
    }

    fn question(question_type: QuestionType, options: Vec<QuestionOptionCreate>) -> QuestionCreate {
        QuestionCreate {
            text: String::from("2 + 2 = ?"),
            question_type,
            order_index: None,
            options,
        }
    }

    #[test]
    fn valid_single_choice() {
        let q = question(QuestionType::SingleChoice, vec![option("4", true), option("5", false)]);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn single_choice_with_two_correct_options_is_rejected() {
        let q = question(QuestionType::SingleChoice, vec![option("4", true), option("four", true)]);
        assert!(q.validate().is_err());

        let q = question(QuestionType::MultipleChoice, vec![option("4", true), option("four", true)]);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn needs_two_options_and_a_correct_one() {
        let q = question(QuestionType::SingleChoice, vec![option("4", true)]);
        assert!(q.validate().is_err());

        let q = question(QuestionType::MultipleChoice, vec![option("3", false), option("5", false)]);
        assert!(q.validate().is_err());
    }

    #[test]
    fn gradable_keeps_only_correct_options() {
        let correct = Uuid::new_v4();
        let q = Question {
            id: Uuid::new_v4(),
            question_set_id: Uuid::new_v4(),
            text: String::from("pick"),
            question_type: QuestionType::SingleChoice,
            order_index: 0,
            options: vec![
                QuestionOption { id: correct, option_text: String::from("a"), is_correct: true },
                QuestionOption { id: Uuid::new_v4(), option_text: String::from("b"), is_correct: false },
            ],
        };
        let gradable = q.to_gradable();
        assert_eq!(gradable.correct_option_ids.len(), 1);
        assert!(gradable.correct_option_ids.contains(&correct));
    }
}
