//! Question bank administration. Matches keep their own snapshot, so nothing here touches
//! existing matches.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{models::QuestionEntity, quiz_store::QuizStore},
    dto::{
        common::Paginated,
        question::{QuestionInput, QuestionListQuery, QuestionSortBy, QuestionView},
    },
    error::ServiceError,
    state::SharedState,
};

/// Add an unpublished question to the bank.
pub async fn create_question(
    state: &SharedState,
    input: QuestionInput,
) -> Result<QuestionView, ServiceError> {
    let store = state.require_quiz_store().await?;
    let (body, correct_answers) = input.normalized();
    let question = QuestionEntity {
        id: Uuid::new_v4(),
        body,
        correct_answers,
        published: false,
        created_at: SystemTime::now(),
        updated_at: None,
        deleted_at: None,
    };
    store.insert_question(question.clone()).await?;
    info!(question_id = %question.id, "question created");
    Ok(QuestionView::from(&question))
}

/// Replace body and accepted answers of a live question.
pub async fn update_question(
    state: &SharedState,
    id: Uuid,
    input: QuestionInput,
) -> Result<QuestionView, ServiceError> {
    let store = state.require_quiz_store().await?;
    let mut question = find_live(store.as_ref(), id).await?;
    let (body, correct_answers) = input.normalized();
    question.body = body;
    question.correct_answers = correct_answers;
    question.updated_at = Some(SystemTime::now());
    store.update_question(question.clone()).await?;
    Ok(QuestionView::from(&question))
}

/// Make a question eligible (or not) for new matches.
pub async fn set_published(
    state: &SharedState,
    id: Uuid,
    published: bool,
) -> Result<QuestionView, ServiceError> {
    let store = state.require_quiz_store().await?;
    let mut question = find_live(store.as_ref(), id).await?;
    question.published = published;
    question.updated_at = Some(SystemTime::now());
    store.update_question(question.clone()).await?;
    info!(question_id = %id, published, "question publication changed");
    Ok(QuestionView::from(&question))
}

/// Soft delete; the question disappears from listings and random draws.
pub async fn delete_question(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_quiz_store().await?;
    let mut question = find_live(store.as_ref(), id).await?;
    question.deleted_at = Some(SystemTime::now());
    store.update_question(question).await?;
    info!(question_id = %id, "question deleted");
    Ok(())
}

/// Filter, sort and paginate live questions.
pub async fn list_questions(
    state: &SharedState,
    query: QuestionListQuery,
) -> Result<Paginated<QuestionView>, ServiceError> {
    let store = state.require_quiz_store().await?;
    let needle = query
        .body_search_term
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase);

    let mut questions: Vec<QuestionEntity> = store
        .list_questions()
        .await?
        .into_iter()
        .filter(|q| query.published_status.matches(q.published))
        .filter(|q| {
            needle
                .as_deref()
                .is_none_or(|needle| q.body.to_lowercase().contains(needle))
        })
        .collect();

    questions.sort_by(|a, b| {
        let ordering = match query.sort_by {
            QuestionSortBy::CreatedAt => a.created_at.cmp(&b.created_at),
            QuestionSortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            QuestionSortBy::Body => a.body.cmp(&b.body),
        };
        query
            .sort_direction
            .apply(ordering)
            .then_with(|| a.id.cmp(&b.id))
    });

    let views = questions.iter().map(QuestionView::from).collect();
    Ok(Paginated::from_sorted(
        views,
        query.page_number,
        query.page_size,
    ))
}

async fn find_live(store: &dyn QuizStore, id: Uuid) -> Result<QuestionEntity, ServiceError> {
    store
        .find_question(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("question `{id}` not found")))
}
