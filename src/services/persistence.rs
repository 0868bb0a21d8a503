//! Load and save helpers keeping the in-memory match version in step with storage.

use uuid::Uuid;

use crate::{dao::quiz_store::QuizStore, error::ServiceError, state::quiz_match::QuizMatch};

/// Load a match and lift it into the domain model.
pub async fn load_match(store: &dyn QuizStore, id: Uuid) -> Result<Option<QuizMatch>, ServiceError> {
    Ok(store.find_match(id).await?.map(QuizMatch::from))
}

/// Write `quiz_match` back, guarded by the version it was loaded at.
pub async fn save_match(store: &dyn QuizStore, quiz_match: &mut QuizMatch) -> Result<(), ServiceError> {
    let expected = quiz_match.version;
    store
        .update_match(quiz_match.clone().into(), expected)
        .await?;
    quiz_match.version = expected + 1;
    Ok(())
}
