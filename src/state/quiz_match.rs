use std::time::{Duration, SystemTime};

use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::models::{
        AnswerEntity, AnswerVerdict, MatchEntity, MatchStatus, PlayerProgressEntity, PlayerRole,
        QuestionSnapshotEntity,
    },
    state::state_machine::{FinishReason, InvalidTransition, MatchEvent, next_status},
};

/// Number of questions frozen into every match.
pub const QUESTIONS_PER_MATCH: usize = 5;
/// Points credited to the fastest finisher when the match closes.
pub const SPEED_BONUS: u32 = 1;

/// Identity of a player as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRef {
    /// Stable identifier from the identity provider.
    pub id: String,
    /// Display name.
    pub login: String,
}

/// Question copied into a match at activation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSnapshot {
    /// Question identifier.
    pub id: Uuid,
    /// Question text.
    pub body: String,
    /// Accepted answers.
    pub correct_answers: Vec<String>,
}

impl QuestionSnapshot {
    /// Exact, case-sensitive comparison against the accepted answers.
    pub fn accepts(&self, answer: &str) -> bool {
        self.correct_answers.iter().any(|accepted| accepted == answer)
    }
}

/// Immutable answer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// Answer identifier.
    pub id: Uuid,
    /// Snapshot question answered.
    pub question_id: Uuid,
    /// Verdict.
    pub verdict: AnswerVerdict,
    /// Client retry token, if one was sent.
    pub request_id: Option<String>,
    /// When the answer was recorded.
    pub created_at: SystemTime,
}

/// A player's cursor, score and answers within one match.
///
/// Answers can only be appended through [`PlayerProgress::record`], which keeps the cursor equal
/// to the number of answers and the score monotonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProgress {
    /// Primary key of the progress row.
    pub id: Uuid,
    /// Seated player.
    pub player: PlayerRef,
    /// Seat taken when joining.
    pub role: PlayerRole,
    /// When the player took the seat.
    pub created_at: SystemTime,
    cursor: usize,
    score: u32,
    answers: Vec<Answer>,
}

impl PlayerProgress {
    fn new(player: PlayerRef, role: PlayerRole, now: SystemTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            player,
            role,
            created_at: now,
            cursor: 0,
            score: 0,
            answers: Vec::new(),
        }
    }

    /// Index of the next unanswered question.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Correct answers plus any speed bonus.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Answers in append order.
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// Whether every question of the snapshot has been answered.
    pub fn is_complete(&self) -> bool {
        self.cursor >= QUESTIONS_PER_MATCH
    }

    fn record(
        &mut self,
        question_id: Uuid,
        verdict: AnswerVerdict,
        request_id: Option<String>,
        now: SystemTime,
    ) -> Answer {
        let answer = Answer {
            id: Uuid::new_v4(),
            question_id,
            verdict,
            request_id,
            created_at: now,
        };
        self.answers.push(answer.clone());
        self.cursor += 1;
        if verdict == AnswerVerdict::Correct {
            self.score += 1;
        }
        answer
    }
}

/// Rule violations raised by match operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchRuleError {
    /// Operation requires an Active match.
    #[error("match is not active")]
    NotActive,
    /// Caller holds no seat in the match.
    #[error("player `{0}` does not take part in this match")]
    NotAParticipant(String),
    /// Caller already answered every question.
    #[error("every question has already been answered")]
    NoActiveQuestion,
    /// Caller tried to join their own match.
    #[error("player `{0}` already holds a seat in this match")]
    AlreadySeated(String),
    /// Activation got a snapshot of the wrong size.
    #[error("a match needs {expected} questions, got {actual}")]
    WrongQuestionCount { expected: usize, actual: usize },
    /// Status machine refused the move.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// Side effects of closing a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOutcome {
    /// What closed the match.
    pub reason: FinishReason,
    /// Number of incorrect answers synthesized for unanswered questions.
    pub auto_filled: usize,
    /// Progress credited with the speed bonus, if any.
    pub bonus_awarded_to: Option<Uuid>,
}

/// What a recorded submission did to the match beyond appending the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEffect {
    /// Neither player is done yet, or the trailing player advanced inside the grace window.
    Continue,
    /// The submitter finished first; the rival has until `deadline`.
    GraceOpened { deadline: SystemTime },
    /// Both players are done and the match was finalized.
    Finished(FinalizeOutcome),
}

/// Result of a scored submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// The recorded answer.
    pub answer: Answer,
    /// Follow-up on the match.
    pub effect: SubmissionEffect,
}

/// Two-player quiz match with its progress rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizMatch {
    /// Match identifier.
    pub id: Uuid,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Snapshot fixed at activation; `None` while pending.
    pub questions: Option<Vec<QuestionSnapshot>>,
    /// First player, then second once joined.
    pub players: Vec<PlayerProgress>,
    /// Creation instant.
    pub created_at: SystemTime,
    /// Activation instant.
    pub started_at: Option<SystemTime>,
    /// Finalization instant.
    pub finished_at: Option<SystemTime>,
    /// Set when the first player finishes; cleared on finalize.
    pub grace_deadline: Option<SystemTime>,
    /// Progress id of the first player to answer every question.
    pub fastest_finisher: Option<Uuid>,
    /// Stored version this copy was loaded at.
    pub version: u64,
}

impl QuizMatch {
    /// Open a pending match already holding its first player.
    pub fn open(player: PlayerRef, now: SystemTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: MatchStatus::Pending,
            questions: None,
            players: vec![PlayerProgress::new(player, PlayerRole::First, now)],
            created_at: now,
            started_at: None,
            finished_at: None,
            grace_deadline: None,
            fastest_finisher: None,
            version: 0,
        }
    }

    /// Whether `player_id` holds a seat.
    pub fn has_player(&self, player_id: &str) -> bool {
        self.progress_of(player_id).is_some()
    }

    /// Progress of `player_id`.
    pub fn progress_of(&self, player_id: &str) -> Option<&PlayerProgress> {
        self.players.iter().find(|p| p.player.id == player_id)
    }

    /// Progress seated as `role`.
    pub fn progress_by_role(&self, role: PlayerRole) -> Option<&PlayerProgress> {
        self.players.iter().find(|p| p.role == role)
    }

    /// Seat the second player and freeze the question snapshot.
    pub fn activate(
        &mut self,
        player: PlayerRef,
        questions: Vec<QuestionSnapshot>,
        now: SystemTime,
    ) -> Result<(), MatchRuleError> {
        let next = next_status(self.status, MatchEvent::SecondPlayerJoined)?;
        if self.has_player(&player.id) {
            return Err(MatchRuleError::AlreadySeated(player.id));
        }
        if questions.len() != QUESTIONS_PER_MATCH {
            return Err(MatchRuleError::WrongQuestionCount {
                expected: QUESTIONS_PER_MATCH,
                actual: questions.len(),
            });
        }

        self.players
            .push(PlayerProgress::new(player, PlayerRole::Second, now));
        self.questions = Some(questions);
        self.started_at = Some(now);
        self.status = next;
        Ok(())
    }

    /// Whether the grace window is over. The deadline instant itself counts as passed.
    pub fn grace_expired(&self, now: SystemTime) -> bool {
        self.status == MatchStatus::Active
            && self.grace_deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Finalize the match if its grace window is over; no-op otherwise.
    pub fn expire_if_due(&mut self, now: SystemTime) -> Option<FinalizeOutcome> {
        if !self.grace_expired(now) {
            return None;
        }
        self.finalize(FinishReason::GraceExpired, now).ok()
    }

    /// Answer previously stored for the same client request, if the player's latest answer carries
    /// `request_id`.
    pub fn replayed_answer(&self, player_id: &str, request_id: Option<&str>) -> Option<&Answer> {
        let request_id = request_id?;
        self.progress_of(player_id)?
            .answers
            .last()
            .filter(|answer| answer.request_id.as_deref() == Some(request_id))
    }

    /// Score `answer_text` against the submitter's active question and apply completion rules.
    pub fn submit(
        &mut self,
        player_id: &str,
        answer_text: &str,
        request_id: Option<String>,
        now: SystemTime,
        grace_period: Duration,
    ) -> Result<Submission, MatchRuleError> {
        if self.status != MatchStatus::Active {
            return Err(MatchRuleError::NotActive);
        }
        let me = self
            .players
            .iter()
            .position(|p| p.player.id == player_id)
            .ok_or_else(|| MatchRuleError::NotAParticipant(player_id.to_owned()))?;
        let rival = self
            .players
            .iter()
            .position(|p| p.player.id != player_id)
            .ok_or(MatchRuleError::NotActive)?;

        let cursor = self.players[me].cursor;
        if cursor >= QUESTIONS_PER_MATCH {
            return Err(MatchRuleError::NoActiveQuestion);
        }
        let question = self
            .questions
            .as_ref()
            .and_then(|questions| questions.get(cursor))
            .ok_or(MatchRuleError::NoActiveQuestion)?;
        let verdict = if question.accepts(answer_text) {
            AnswerVerdict::Correct
        } else {
            AnswerVerdict::Incorrect
        };
        let question_id = question.id;

        let answer = self.players[me].record(question_id, verdict, request_id, now);

        let me_done = self.players[me].is_complete();
        let rival_done = self.players[rival].is_complete();
        let effect = if me_done && rival_done {
            SubmissionEffect::Finished(self.finalize(FinishReason::AllAnswered, now)?)
        } else if me_done && self.grace_deadline.is_none() {
            let deadline = now + grace_period;
            self.grace_deadline = Some(deadline);
            self.fastest_finisher = Some(self.players[me].id);
            SubmissionEffect::GraceOpened { deadline }
        } else {
            SubmissionEffect::Continue
        };

        Ok(Submission { answer, effect })
    }

    /// Close an active match.
    ///
    /// Shared by the submission path and the expiry sweep: the fastest finisher earns
    /// [`SPEED_BONUS`] when their own score is non-zero, every unanswered question is filled with an
    /// incorrect answer (scores untouched), and the grace deadline is cleared.
    pub fn finalize(
        &mut self,
        reason: FinishReason,
        now: SystemTime,
    ) -> Result<FinalizeOutcome, InvalidTransition> {
        let next = next_status(self.status, MatchEvent::Finish(reason))?;

        let bonus_awarded_to = self
            .fastest_finisher
            .and_then(|fastest| self.players.iter_mut().find(|p| p.id == fastest))
            .filter(|progress| progress.score > 0)
            .map(|progress| {
                progress.score += SPEED_BONUS;
                progress.id
            });

        let questions = self.questions.as_deref().unwrap_or_default();
        let mut auto_filled = 0;
        for progress in &mut self.players {
            while let Some(question) = questions.get(progress.cursor) {
                progress.record(question.id, AnswerVerdict::Incorrect, None, now);
                auto_filled += 1;
            }
        }

        self.status = next;
        self.finished_at = Some(now);
        self.grace_deadline = None;

        Ok(FinalizeOutcome {
            reason,
            auto_filled,
            bonus_awarded_to,
        })
    }
}

impl From<QuestionSnapshotEntity> for QuestionSnapshot {
    fn from(value: QuestionSnapshotEntity) -> Self {
        Self {
            id: value.id,
            body: value.body,
            correct_answers: value.correct_answers,
        }
    }
}

impl From<QuestionSnapshot> for QuestionSnapshotEntity {
    fn from(value: QuestionSnapshot) -> Self {
        Self {
            id: value.id,
            body: value.body,
            correct_answers: value.correct_answers,
        }
    }
}

impl From<AnswerEntity> for Answer {
    fn from(value: AnswerEntity) -> Self {
        Self {
            id: value.id,
            question_id: value.question_id,
            verdict: value.verdict,
            request_id: value.request_id,
            created_at: value.created_at,
        }
    }
}

impl From<Answer> for AnswerEntity {
    fn from(value: Answer) -> Self {
        Self {
            id: value.id,
            question_id: value.question_id,
            verdict: value.verdict,
            request_id: value.request_id,
            created_at: value.created_at,
        }
    }
}

impl From<PlayerProgressEntity> for PlayerProgress {
    fn from(value: PlayerProgressEntity) -> Self {
        let answers: Vec<Answer> = value.answers.into_iter().map(Into::into).collect();
        Self {
            id: value.id,
            player: PlayerRef {
                id: value.player_id,
                login: value.player_login,
            },
            role: value.role,
            created_at: value.created_at,
            // The answer list is authoritative for the cursor.
            cursor: answers.len(),
            score: value.score,
            answers,
        }
    }
}

impl From<PlayerProgress> for PlayerProgressEntity {
    fn from(value: PlayerProgress) -> Self {
        Self {
            id: value.id,
            player_id: value.player.id,
            player_login: value.player.login,
            role: value.role,
            cursor: value.cursor as u32,
            score: value.score,
            answers: value.answers.into_iter().map(Into::into).collect(),
            created_at: value.created_at,
        }
    }
}

impl From<MatchEntity> for QuizMatch {
    fn from(value: MatchEntity) -> Self {
        let mut players: Vec<PlayerProgress> =
            value.players.into_iter().map(Into::into).collect();
        players.sort_by_key(|p| p.role);
        Self {
            id: value.id,
            status: value.status,
            questions: value
                .questions
                .map(|questions| questions.into_iter().map(Into::into).collect()),
            players,
            created_at: value.created_at,
            started_at: value.started_at,
            finished_at: value.finished_at,
            grace_deadline: value.grace_deadline,
            fastest_finisher: value.fastest_finisher,
            version: value.version,
        }
    }
}

impl From<QuizMatch> for MatchEntity {
    fn from(value: QuizMatch) -> Self {
        Self {
            id: value.id,
            status: value.status,
            questions: value
                .questions
                .map(|questions| questions.into_iter().map(Into::into).collect()),
            players: value.players.into_iter().map(Into::into).collect(),
            created_at: value.created_at,
            started_at: value.started_at,
            finished_at: value.finished_at,
            grace_deadline: value.grace_deadline,
            fastest_finisher: value.fastest_finisher,
            version: value.version,
        }
    }
}
