//! Pairs an arriving player with the oldest pending match or opens a new one.

use std::time::SystemTime;

use tracing::{debug, info};

use crate::{
    dao::{models::QuestionSnapshotEntity, quiz_store::QuizStore},
    dto::quiz_match::MatchView,
    error::ServiceError,
    services::persistence::{load_match, save_match},
    state::{
        SharedState,
        quiz_match::{PlayerRef, QUESTIONS_PER_MATCH, QuestionSnapshot, QuizMatch},
    },
};

/// Join the oldest pending match of another player, or open a new pending match.
///
/// Calls are serialized by the matchmaking gate, and joining additionally holds the lock of the
/// joined match. Questions are drawn before anything is written, so a short question bank leaves
/// the pending match untouched and still joinable.
pub async fn create_or_join(state: &SharedState, player: PlayerRef) -> Result<MatchView, ServiceError> {
    let store = state.require_quiz_store().await?;
    let _gate = state.matchmaking_gate().lock().await;

    if let Some(open) = store.find_open_match_for_player(player.id.clone()).await? {
        debug!(player_id = %player.id, match_id = %open.id, "player already holds an open match");
        return Err(ServiceError::AlreadyInMatch);
    }

    let Some(pending) = store.find_pending_match(player.id.clone()).await? else {
        let quiz_match = QuizMatch::open(player, SystemTime::now());
        store.insert_match(quiz_match.clone().into()).await?;
        info!(
            match_id = %quiz_match.id,
            player_id = %quiz_match.players[0].player.id,
            "opened pending match"
        );
        return Ok(MatchView::from(&quiz_match));
    };

    let questions = draw_questions(store.as_ref()).await?;

    let _guard = state.match_locks().acquire(pending.id).await;
    let mut quiz_match = load_match(store.as_ref(), pending.id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("match `{}` vanished", pending.id)))?;
    let player_id = player.id.clone();
    quiz_match.activate(player, questions, SystemTime::now())?;
    save_match(store.as_ref(), &mut quiz_match).await?;

    info!(
        match_id = %quiz_match.id,
        player_id = %player_id,
        "second player joined; match active"
    );
    Ok(MatchView::from(&quiz_match))
}

async fn draw_questions(store: &dyn QuizStore) -> Result<Vec<QuestionSnapshot>, ServiceError> {
    let drawn = store
        .pick_random_published_questions(QUESTIONS_PER_MATCH)
        .await?;
    if drawn.len() < QUESTIONS_PER_MATCH {
        return Err(ServiceError::InsufficientQuestions {
            available: drawn.len(),
            required: QUESTIONS_PER_MATCH,
        });
    }

    Ok(drawn
        .iter()
        .map(|question| QuestionSnapshotEntity::from(question).into())
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{MatchStatus, PlayerRole},
            quiz_store::memory::InMemoryQuizStore,
        },
        dto::quiz_match::MatchStatusView,
        services::test_support::{finish_match, player, seed_questions},
        state::AppState,
    };

    fn state_with(store: &InMemoryQuizStore) -> SharedState {
        AppState::with_store(AppConfig::default(), Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn first_caller_opens_pending_match_and_second_joins_it() {
        let store = InMemoryQuizStore::new();
        seed_questions(&store, 6).await;
        let state = state_with(&store);

        let opened = create_or_join(&state, player("alice")).await.unwrap();
        assert_eq!(opened.status, MatchStatusView::PendingSecondPlayer);
        assert!(opened.questions.is_none());

        let joined = create_or_join(&state, player("bob")).await.unwrap();
        assert_eq!(joined.id, opened.id);
        assert_eq!(joined.status, MatchStatusView::Active);
        assert_eq!(joined.questions.as_ref().map(Vec::len), Some(QUESTIONS_PER_MATCH));
        assert!(joined.start_game_date.is_some());

        let stored = store.find_match(opened.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MatchStatus::Active);
        assert_eq!(stored.players[1].role, PlayerRole::Second);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn player_with_open_match_cannot_queue_again() {
        let store = InMemoryQuizStore::new();
        seed_questions(&store, 5).await;
        let state = state_with(&store);

        create_or_join(&state, player("alice")).await.unwrap();
        assert!(matches!(
            create_or_join(&state, player("alice")).await,
            Err(ServiceError::AlreadyInMatch)
        ));

        let active = create_or_join(&state, player("bob")).await.unwrap();
        for id in ["alice", "bob"] {
            assert!(matches!(
                create_or_join(&state, player(id)).await,
                Err(ServiceError::AlreadyInMatch)
            ));
        }

        finish_match(&state, active.id).await;
        let next = create_or_join(&state, player("alice")).await.unwrap();
        assert_ne!(next.id, active.id);
        assert_eq!(next.status, MatchStatusView::PendingSecondPlayer);
    }

    #[tokio::test]
    async fn short_question_bank_leaves_pending_match_joinable() {
        let store = InMemoryQuizStore::new();
        seed_questions(&store, 3).await;
        let state = state_with(&store);

        let opened = create_or_join(&state, player("alice")).await.unwrap();
        assert!(matches!(
            create_or_join(&state, player("bob")).await,
            Err(ServiceError::InsufficientQuestions {
                available: 3,
                required: QUESTIONS_PER_MATCH
            })
        ));

        let untouched = store.find_match(opened.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, MatchStatus::Pending);
        assert_eq!(untouched.players.len(), 1);
        assert!(untouched.questions.is_none());
        assert_eq!(untouched.version, 0);
        assert!(store.find_open_match_for_player("bob".into()).await.unwrap().is_none());

        seed_questions(&store, 2).await;
        let joined = create_or_join(&state, player("bob")).await.unwrap();
        assert_eq!(joined.id, opened.id);
        assert_eq!(joined.status, MatchStatusView::Active);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_arrivals_pair_up_without_double_join() {
        let store = InMemoryQuizStore::new();
        seed_questions(&store, 10).await;
        let state = state_with(&store);

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let state = state.clone();
                tokio::spawn(async move { create_or_join(&state, player(&format!("p{i}"))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut active = 0;
        for i in 0..6 {
            let open = store
                .find_open_match_for_player(format!("p{i}"))
                .await
                .unwrap()
                .unwrap();
            assert!(open.players.len() <= 2);
            if open.status == MatchStatus::Active {
                active += 1;
            }
        }
        assert_eq!(active, 6, "six arrivals form three active matches");
    }
}
