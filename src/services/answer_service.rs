//! Scores answers of the caller's active match under the per-match lock.

use std::time::SystemTime;

use tracing::{debug, info};

use crate::{
    dao::models::MatchStatus,
    dto::quiz_match::{AnswerView, SubmitAnswerRequest},
    error::ServiceError,
    services::persistence::{load_match, save_match},
    state::{SharedState, quiz_match::SubmissionEffect},
};

/// Record `request.answer` against the caller's active question.
///
/// The whole load, score and write sequence runs under the match lock so submissions of both
/// players are applied one after the other. A submission arriving after the grace window closed
/// finalizes the match and fails with [`ServiceError::MatchTimedOut`].
pub async fn submit_answer(
    state: &SharedState,
    player_id: &str,
    request: SubmitAnswerRequest,
) -> Result<AnswerView, ServiceError> {
    let store = state.require_quiz_store().await?;

    let open = store
        .find_open_match_for_player(player_id.to_owned())
        .await?
        .filter(|entity| entity.status == MatchStatus::Active)
        .ok_or(ServiceError::NoActiveMatch)?;

    let _guard = state.match_locks().acquire(open.id).await;
    let mut quiz_match = load_match(store.as_ref(), open.id)
        .await?
        .filter(|quiz_match| quiz_match.has_player(player_id))
        .ok_or(ServiceError::NoActiveMatch)?;

    if quiz_match.status != MatchStatus::Active {
        return Err(ServiceError::NoActiveMatch);
    }

    let now = SystemTime::now();
    if let Some(outcome) = quiz_match.expire_if_due(now) {
        save_match(store.as_ref(), &mut quiz_match).await?;
        state.match_locks().release_finished(quiz_match.id);
        info!(
            match_id = %quiz_match.id,
            player_id,
            auto_filled = outcome.auto_filled,
            "late submission finalized expired match"
        );
        return Err(ServiceError::MatchTimedOut);
    }

    if let Some(answer) = quiz_match.replayed_answer(player_id, request.request_id.as_deref()) {
        debug!(match_id = %quiz_match.id, player_id, "replayed submission; returning stored answer");
        return Ok(AnswerView::from(answer));
    }

    let submission = quiz_match.submit(
        player_id,
        &request.answer,
        request.request_id,
        now,
        state.config().grace_period(),
    )?;
    save_match(store.as_ref(), &mut quiz_match).await?;

    match &submission.effect {
        SubmissionEffect::Continue => {
            debug!(
                match_id = %quiz_match.id,
                player_id,
                verdict = ?submission.answer.verdict,
                "answer recorded"
            );
        }
        SubmissionEffect::GraceOpened { .. } => {
            info!(
                match_id = %quiz_match.id,
                player_id,
                grace_ms = state.config().grace_period().as_millis() as u64,
                "player finished first; grace window opened"
            );
        }
        SubmissionEffect::Finished(outcome) => {
            state.match_locks().release_finished(quiz_match.id);
            info!(
                match_id = %quiz_match.id,
                bonus_progress = ?outcome.bonus_awarded_to,
                "both players answered every question; match finished"
            );
        }
    }

    Ok(AnswerView::from(&submission.answer))
}
