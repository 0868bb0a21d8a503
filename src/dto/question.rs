use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::QuestionEntity,
    dto::{
        common::{SortDirection, default_page_number, default_page_size},
        format_system_time,
        validation::{validate_correct_answers, validate_question_body},
    },
};

/// Body of the create and update question routes.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    /// Question text, trimmed before storage.
    pub body: String,
    /// Accepted answers; at least one.
    pub correct_answers: Vec<String>,
}

impl QuestionInput {
    /// Trimmed copy of the body and accepted answers.
    pub fn normalized(self) -> (String, Vec<String>) {
        let body = self.body.trim().to_owned();
        let answers = self
            .correct_answers
            .into_iter()
            .map(|answer| answer.trim().to_owned())
            .collect();
        (body, answers)
    }
}

impl Validate for QuestionInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_question_body(&self.body) {
            errors.add("body", e);
        }
        if let Err(e) = validate_correct_answers(&self.correct_answers) {
            errors.add("correctAnswers", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Body of `PUT /sa/quiz/questions/{id}/publish`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PublishQuestionRequest {
    /// Target publication state.
    pub published: bool,
}

/// Publication filter of the question listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum PublishedStatus {
    /// Every question.
    #[default]
    All,
    /// Published questions only.
    Published,
    /// Unpublished questions only.
    NotPublished,
}

impl PublishedStatus {
    /// Whether a question with the given flag passes the filter.
    pub fn matches(self, published: bool) -> bool {
        match self {
            PublishedStatus::All => true,
            PublishedStatus::Published => published,
            PublishedStatus::NotPublished => !published,
        }
    }
}

/// Sort key of the question listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum QuestionSortBy {
    /// Creation instant.
    #[default]
    CreatedAt,
    /// Last edit instant.
    UpdatedAt,
    /// Question text.
    Body,
}

/// Query string of `GET /sa/quiz/questions`.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct QuestionListQuery {
    /// Case-insensitive substring filter on the body.
    #[serde(default)]
    pub body_search_term: Option<String>,
    /// Publication filter.
    #[serde(default)]
    pub published_status: PublishedStatus,
    /// Sort key.
    #[serde(default)]
    pub sort_by: QuestionSortBy,
    /// Sort direction.
    #[serde(default)]
    pub sort_direction: SortDirection,
    /// 1-based page number.
    #[serde(default = "default_page_number")]
    #[validate(range(min = 1))]
    pub page_number: u64,
    /// Items per page.
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub page_size: u64,
}

/// Question as seen by administrators.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    /// Question identifier.
    pub id: Uuid,
    /// Question text.
    pub body: String,
    /// Accepted answers.
    pub correct_answers: Vec<String>,
    /// Whether the question can be drawn.
    pub published: bool,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last edit.
    pub updated_at: Option<String>,
}

impl From<&QuestionEntity> for QuestionView {
    fn from(question: &QuestionEntity) -> Self {
        Self {
            id: question.id,
            body: question.body.clone(),
            correct_answers: question.correct_answers.clone(),
            published: question.published,
            created_at: format_system_time(question.created_at),
            updated_at: question.updated_at.map(format_system_time),
        }
    }
}
