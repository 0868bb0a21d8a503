//! Background task finalizing matches whose grace window elapsed without the trailing player
//! finishing.

use std::time::SystemTime;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::quiz_store::QuizStore,
    error::ServiceError,
    services::persistence::{load_match, save_match},
    state::SharedState,
};

/// Outcome counters of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Matches finalized by this sweep.
    pub finalized: usize,
    /// Due matches already closed by a concurrent submission.
    pub skipped: usize,
    /// Matches left for the next sweep after an error.
    pub failed: usize,
}

/// Sweep forever at the configured interval. Skips ticks while storage is degraded.
pub async fn run(state: SharedState) {
    let mut ticker = interval(state.config().sweep_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if state.is_degraded() {
            continue;
        }

        match sweep_expired(&state).await {
            Ok(report) if report.finalized > 0 || report.failed > 0 => {
                info!(
                    finalized = report.finalized,
                    skipped = report.skipped,
                    failed = report.failed,
                    "expiry sweep completed"
                );
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "expiry sweep could not list due matches"),
        }
    }
}

/// Finalize every active match whose grace deadline has passed.
///
/// Each match is handled under its own lock and its own write; a failure is logged and counted
/// without stopping the sweep.
pub async fn sweep_expired(state: &SharedState) -> Result<SweepReport, ServiceError> {
    let store = state.require_quiz_store().await?;
    let now = SystemTime::now();
    let due = store.list_expired_match_ids(now).await?;

    let mut report = SweepReport::default();
    for match_id in due {
        match finalize_expired(state, store.as_ref(), match_id, now).await {
            Ok(true) => report.finalized += 1,
            Ok(false) => report.skipped += 1,
            Err(err) => {
                report.failed += 1;
                warn!(%match_id, error = %err, "failed to finalize expired match; retrying next sweep");
            }
        }
    }

    Ok(report)
}

async fn finalize_expired(
    state: &SharedState,
    store: &dyn QuizStore,
    match_id: Uuid,
    now: SystemTime,
) -> Result<bool, ServiceError> {
    let _guard = state.match_locks().acquire(match_id).await;
    let Some(mut quiz_match) = load_match(store, match_id).await? else {
        return Ok(false);
    };

    // Re-checked under the lock: a submission may have closed the match since the scan.
    let Some(outcome) = quiz_match.expire_if_due(now) else {
        debug!(%match_id, status = ?quiz_match.status, "due match already closed");
        return Ok(false);
    };

    save_match(store, &mut quiz_match).await?;
    state.match_locks().release_finished(match_id);
    info!(
        %match_id,
        auto_filled = outcome.auto_filled,
        bonus_progress = ?outcome.bonus_awarded_to,
        "finalized match after grace window"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{AnswerVerdict, MatchEntity, MatchStatus, QuestionEntity},
            quiz_store::memory::InMemoryQuizStore,
            storage::{StorageError, StorageResult},
        },
        services::{
            answer_service::submit_answer,
            matchmaking_service::create_or_join,
            test_support::{answer, player, seed_questions},
        },
        state::{AppState, quiz_match::QUESTIONS_PER_MATCH},
    };

    /// Delegating store whose match writes fail for one poisoned id.
    struct FlakyStore {
        inner: InMemoryQuizStore,
        poisoned: std::sync::Mutex<Option<Uuid>>,
    }

    impl QuizStore for FlakyStore {
        fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.insert_match(entity)
        }
        fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
            self.inner.find_match(id)
        }
        fn update_match(
            &self,
            entity: MatchEntity,
            expected_version: u64,
        ) -> BoxFuture<'static, StorageResult<()>> {
            if *self.poisoned.lock().unwrap() == Some(entity.id) {
                return Box::pin(async {
                    Err(StorageError::unavailable(
                        "write refused".into(),
                        std::io::Error::other("disk on fire"),
                    ))
                });
            }
            self.inner.update_match(entity, expected_version)
        }
        fn find_open_match_for_player(
            &self,
            player_id: String,
        ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
            self.inner.find_open_match_for_player(player_id)
        }
        fn find_pending_match(
            &self,
            excluding_player: String,
        ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
            self.inner.find_pending_match(excluding_player)
        }
        fn list_expired_match_ids(
            &self,
            now: SystemTime,
        ) -> BoxFuture<'static, StorageResult<Vec<Uuid>>> {
            self.inner.list_expired_match_ids(now)
        }
        fn list_matches_for_player(
            &self,
            player_id: String,
        ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
            self.inner.list_matches_for_player(player_id)
        }
        fn list_finished_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
            self.inner.list_finished_matches()
        }
        fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.insert_question(question)
        }
        fn update_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.update_question(question)
        }
        fn find_question(
            &self,
            id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
            self.inner.find_question(id)
        }
        fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
            self.inner.list_questions()
        }
        fn pick_random_published_questions(
            &self,
            count: usize,
        ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
            self.inner.pick_random_published_questions(count)
        }
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }
        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    async fn expired_match(state: &SharedState, first: &str, second: &str, pattern: &[bool]) -> Uuid {
        create_or_join(state, player(first)).await.unwrap();
        let view = create_or_join(state, player(second)).await.unwrap();
        for correct in pattern {
            let text = if *correct { "right" } else { "wrong" };
            submit_answer(state, first, answer(text)).await.unwrap();
        }
        view.id
    }

    fn zero_grace() -> AppConfig {
        AppConfig::default().with_grace_period(Duration::ZERO)
    }

    #[tokio::test]
    async fn sweep_auto_fills_and_finalizes_due_match() {
        let store = InMemoryQuizStore::new();
        seed_questions(&store, 5).await;
        let state = AppState::with_store(zero_grace(), Arc::new(store.clone()));

        let id = expired_match(&state, "carol", "dave", &[true; QUESTIONS_PER_MATCH]).await;
        let report = sweep_expired(&state).await.unwrap();
        assert_eq!(report, SweepReport {
            finalized: 1,
            skipped: 0,
            failed: 0
        });

        let entity = store.find_match(id).await.unwrap().unwrap();
        assert_eq!(entity.status, MatchStatus::Finished);
        assert!(entity.grace_deadline.is_none());
        let carol = entity.players.iter().find(|p| p.player_id == "carol").unwrap();
        let dave = entity.players.iter().find(|p| p.player_id == "dave").unwrap();
        assert_eq!(carol.score, 6);
        assert_eq!(dave.score, 0);
        assert_eq!(dave.cursor as usize, QUESTIONS_PER_MATCH);
        assert!(dave.answers.iter().all(|a| a.verdict == AnswerVerdict::Incorrect));

        let before = entity.clone();
        let report = sweep_expired(&state).await.unwrap();
        assert_eq!(report, SweepReport::default());
        assert_eq!(store.find_match(id).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn trailing_player_score_is_kept_and_bonus_needs_finisher_points() {
        let store = InMemoryQuizStore::new();
        seed_questions(&store, 5).await;
        let state = AppState::with_store(zero_grace(), Arc::new(store.clone()));

        create_or_join(&state, player("alice")).await.unwrap();
        let view = create_or_join(&state, player("bob")).await.unwrap();
        submit_answer(&state, "bob", answer("right")).await.unwrap();
        submit_answer(&state, "bob", answer("right")).await.unwrap();
        for _ in 0..QUESTIONS_PER_MATCH {
            submit_answer(&state, "alice", answer("wrong")).await.unwrap();
        }

        sweep_expired(&state).await.unwrap();
        let entity = store.find_match(view.id).await.unwrap().unwrap();
        let alice = entity.players.iter().find(|p| p.player_id == "alice").unwrap();
        let bob = entity.players.iter().find(|p| p.player_id == "bob").unwrap();
        assert_eq!(alice.score, 0, "no bonus without points");
        assert_eq!(bob.score, 2);
        assert_eq!(bob.answers.len(), QUESTIONS_PER_MATCH);
    }

    #[tokio::test]
    async fn one_failing_match_does_not_stop_the_sweep() {
        let inner = InMemoryQuizStore::new();
        seed_questions(&inner, 5).await;
        let flaky = Arc::new(FlakyStore {
            inner: inner.clone(),
            poisoned: std::sync::Mutex::new(None),
        });
        let state = AppState::with_store(zero_grace(), flaky.clone());

        let broken = expired_match(&state, "alice", "bob", &[true; QUESTIONS_PER_MATCH]).await;
        let healthy = expired_match(&state, "carol", "dave", &[true; QUESTIONS_PER_MATCH]).await;
        *flaky.poisoned.lock().unwrap() = Some(broken);

        let report = sweep_expired(&state).await.unwrap();
        assert_eq!(report.finalized, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(
            inner.find_match(healthy).await.unwrap().unwrap().status,
            MatchStatus::Finished
        );
        assert_eq!(
            inner.find_match(broken).await.unwrap().unwrap().status,
            MatchStatus::Active
        );

        flaky.poisoned.lock().unwrap().take();
        let report = sweep_expired(&state).await.unwrap();
        assert_eq!(report.finalized, 1);
        assert_eq!(
            inner.find_match(broken).await.unwrap().unwrap().status,
            MatchStatus::Finished
        );
    }

    #[tokio::test]
    async fn sweep_is_refused_while_degraded() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            sweep_expired(&state).await,
            Err(ServiceError::Degraded)
        ));
    }
}
