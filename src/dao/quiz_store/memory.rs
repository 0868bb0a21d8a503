//! Process-local [`QuizStore`] backed by concurrent maps. Used when no database is configured
//! and by the test-suite.

use std::{sync::Arc, time::SystemTime};

use dashmap::DashMap;
use futures::future::BoxFuture;
use rand::{rng, seq::SliceRandom};
use uuid::Uuid;

use crate::dao::{
    models::{MatchEntity, MatchStatus, QuestionEntity},
    quiz_store::QuizStore,
    storage::{StorageError, StorageResult},
};

/// Process-local [`QuizStore`] backed by concurrent maps.
#[derive(Clone, Default)]
pub struct InMemoryQuizStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    matches: DashMap<Uuid, MatchEntity>,
    questions: DashMap<Uuid, QuestionEntity>,
}

impl InMemoryQuizStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryInner {
    fn update_match(&self, mut entity: MatchEntity, expected_version: u64) -> StorageResult<()> {
        let Some(mut slot) = self.matches.get_mut(&entity.id) else {
            return Err(StorageError::conflict(entity.id, expected_version));
        };
        if slot.version != expected_version {
            return Err(StorageError::conflict(entity.id, expected_version));
        }
        entity.version = expected_version + 1;
        *slot = entity;
        Ok(())
    }

    fn find_open_match_for_player(&self, player_id: &str) -> Option<MatchEntity> {
        self.matches
            .iter()
            .find(|entry| {
                entry.status.is_open() && entry.players.iter().any(|p| p.player_id == player_id)
            })
            .map(|entry| entry.value().clone())
    }

    fn find_pending_match(&self, excluding_player: &str) -> Option<MatchEntity> {
        self.matches
            .iter()
            .filter(|entry| {
                entry.status == MatchStatus::Pending
                    && entry.players.iter().all(|p| p.player_id != excluding_player)
            })
            .min_by_key(|entry| entry.created_at)
            .map(|entry| entry.value().clone())
    }

    fn list_expired_match_ids(&self, now: SystemTime) -> Vec<Uuid> {
        self.matches
            .iter()
            .filter(|entry| {
                entry.status == MatchStatus::Active
                    && entry.grace_deadline.is_some_and(|deadline| deadline <= now)
            })
            .map(|entry| entry.id)
            .collect()
    }

    fn list_matches(&self, keep: impl Fn(&MatchEntity) -> bool) -> Vec<MatchEntity> {
        self.matches
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn live_questions(&self) -> Vec<QuestionEntity> {
        self.questions
            .iter()
            .filter(|entry| entry.deleted_at.is_none())
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn pick_random_published_questions(&self, count: usize) -> Vec<QuestionEntity> {
        let mut candidates: Vec<QuestionEntity> = self
            .questions
            .iter()
            .filter(|entry| entry.is_drawable())
            .map(|entry| entry.value().clone())
            .collect();
        candidates.shuffle(&mut rng());
        candidates.truncate(count);
        candidates
    }
}

impl QuizStore for InMemoryQuizStore {
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.matches.insert(entity.id, entity);
        Box::pin(async { Ok(()) })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let found = self.inner.matches.get(&id).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(found) })
    }

    fn update_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.inner.update_match(entity, expected_version);
        Box::pin(async move { result })
    }

    fn find_open_match_for_player(
        &self,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let found = self.inner.find_open_match_for_player(&player_id);
        Box::pin(async move { Ok(found) })
    }

    fn find_pending_match(
        &self,
        excluding_player: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let found = self.inner.find_pending_match(&excluding_player);
        Box::pin(async move { Ok(found) })
    }

    fn list_expired_match_ids(
        &self,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<Uuid>>> {
        let ids = self.inner.list_expired_match_ids(now);
        Box::pin(async move { Ok(ids) })
    }

    fn list_matches_for_player(
        &self,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let matches = self
            .inner
            .list_matches(|m| m.players.iter().any(|p| p.player_id == player_id));
        Box::pin(async move { Ok(matches) })
    }

    fn list_finished_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let matches = self
            .inner
            .list_matches(|m| m.status == MatchStatus::Finished);
        Box::pin(async move { Ok(matches) })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.questions.insert(question.id, question);
        Box::pin(async { Ok(()) })
    }

    fn update_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.questions.insert(question.id, question);
        Box::pin(async { Ok(()) })
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let found = self
            .inner
            .questions
            .get(&id)
            .filter(|entry| entry.deleted_at.is_none())
            .map(|entry| entry.value().clone());
        Box::pin(async move { Ok(found) })
    }

    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let questions = self.inner.live_questions();
        Box::pin(async move { Ok(questions) })
    }

    fn pick_random_published_questions(
        &self,
        count: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let picked = self.inner.pick_random_published_questions(count);
        Box::pin(async move { Ok(picked) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
