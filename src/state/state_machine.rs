use thiserror::Error;

use crate::dao::models::MatchStatus;

/// Indicates why a match transitioned to finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Both players answered every question.
    AllAnswered,
    /// The grace window elapsed while a player still had questions left.
    GraceExpired,
}

/// Events that can be applied to a match lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// A second player took the free seat; the question snapshot is fixed.
    SecondPlayerJoined,
    /// The match is closed for good.
    Finish(FinishReason),
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// The status the match was in when the invalid event was received.
    pub from: MatchStatus,
    /// The event that cannot be applied from this status.
    pub event: MatchEvent,
}

/// Compute the status reached by applying `event` to a match in `from`.
///
/// `Pending -> Active -> Finished` is the only path; Finished is terminal.
pub fn next_status(from: MatchStatus, event: MatchEvent) -> Result<MatchStatus, InvalidTransition> {
    let next = match (from, event) {
        (MatchStatus::Pending, MatchEvent::SecondPlayerJoined) => MatchStatus::Active,
        (MatchStatus::Active, MatchEvent::Finish(_)) => MatchStatus::Finished,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_happy_path_through_match() {
        let active = next_status(MatchStatus::Pending, MatchEvent::SecondPlayerJoined).unwrap();
        assert_eq!(active, MatchStatus::Active);
        assert_eq!(
            next_status(active, MatchEvent::Finish(FinishReason::AllAnswered)).unwrap(),
            MatchStatus::Finished
        );
    }

    #[test]
    fn grace_expiry_finishes_active_match() {
        assert_eq!(
            next_status(
                MatchStatus::Active,
                MatchEvent::Finish(FinishReason::GraceExpired)
            )
            .unwrap(),
            MatchStatus::Finished
        );
    }

    #[test]
    fn pending_match_cannot_finish() {
        let err = next_status(
            MatchStatus::Pending,
            MatchEvent::Finish(FinishReason::GraceExpired),
        )
        .unwrap_err();
        assert_eq!(err.from, MatchStatus::Pending);
    }

    #[test]
    fn finished_is_terminal() {
        for event in [
            MatchEvent::SecondPlayerJoined,
            MatchEvent::Finish(FinishReason::AllAnswered),
            MatchEvent::Finish(FinishReason::GraceExpired),
        ] {
            let err = next_status(MatchStatus::Finished, event).unwrap_err();
            assert_eq!(err, InvalidTransition {
                from: MatchStatus::Finished,
                event,
            });
        }
    }

    #[test]
    fn active_match_cannot_be_joined_again() {
        assert!(next_status(MatchStatus::Active, MatchEvent::SecondPlayerJoined).is_err());
    }
}
