/// In-memory backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use crate::dao::models::{MatchEntity, QuestionEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for matches and the question bank.
///
/// A match is stored as one aggregate (progress rows and answers embedded), so a single
/// [`QuizStore::update_match`] commits the cursor, score and answers of a submission together.
pub trait QuizStore: Send + Sync {
    /// Persist a freshly opened match at version 0.
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a match by id.
    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Replace a match if its stored version still equals `expected_version`.
    ///
    /// The stored copy receives `expected_version + 1`; a stale writer gets
    /// [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict).
    fn update_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Pending or Active match the player takes part in.
    fn find_open_match_for_player(
        &self,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Oldest Pending match not opened by `excluding_player`.
    fn find_pending_match(
        &self,
        excluding_player: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Active matches whose grace deadline is at or before `now`.
    fn list_expired_match_ids(&self, now: SystemTime)
    -> BoxFuture<'static, StorageResult<Vec<Uuid>>>;
    /// Every match the player takes part in, newest first.
    fn list_matches_for_player(
        &self,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    /// Every finished match.
    fn list_finished_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;

    /// Add a question to the bank.
    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Overwrite a stored question.
    fn update_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a question that has not been soft-deleted.
    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;
    /// Every question that has not been soft-deleted.
    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;
    /// Random draw of at most `count` published, non-deleted questions.
    fn pick_random_published_questions(
        &self,
        count: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;

    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection in place.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
