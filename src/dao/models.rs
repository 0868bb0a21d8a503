use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Lifecycle status of a match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    /// Waiting for a second player.
    Pending,
    /// Both players joined; questions are being answered.
    Active,
    /// Terminal state, no further mutation.
    Finished,
}

impl MatchStatus {
    /// Pending and Active matches count as open for their players.
    pub fn is_open(self) -> bool {
        matches!(self, MatchStatus::Pending | MatchStatus::Active)
    }

    /// Storage label, also used by the MongoDB filters.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Pending => "Pending",
            MatchStatus::Active => "Active",
            MatchStatus::Finished => "Finished",
        }
    }
}

/// Seat taken by a player inside a match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum PlayerRole {
    /// Player who opened the match.
    First,
    /// Player who joined the pending match.
    Second,
}

/// Outcome recorded for a single answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AnswerVerdict {
    /// Answer matched an accepted answer.
    Correct,
    /// Answer matched no accepted answer, or was auto-filled.
    Incorrect,
}

/// Copy of a question frozen into a match when it is activated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionSnapshotEntity {
    /// Identifier of the source question in the bank.
    pub id: Uuid,
    /// Text shown to the players.
    pub body: String,
    /// Accepted answers, matched exactly.
    pub correct_answers: Vec<String>,
}

/// Append-only answer record owned by a player progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntity {
    /// Primary key of the answer.
    pub id: Uuid,
    /// Snapshot question the answer refers to.
    pub question_id: Uuid,
    /// Verdict fixed when recorded.
    pub verdict: AnswerVerdict,
    /// Client supplied identifier used to recognise retried submissions.
    #[serde(default)]
    pub request_id: Option<String>,
    /// When the answer was recorded.
    pub created_at: SystemTime,
}

/// Per-player cursor, score and answers inside one match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerProgressEntity {
    /// Primary key of the progress row.
    pub id: Uuid,
    /// Identifier supplied by the identity provider.
    pub player_id: String,
    /// Display login supplied by the identity provider.
    pub player_login: String,
    /// Seat taken when joining; never changes.
    pub role: PlayerRole,
    /// Index of the next unanswered question.
    pub cursor: u32,
    /// Correct answers plus any speed bonus.
    pub score: u32,
    /// Answers in submission order.
    pub answers: Vec<AnswerEntity>,
    /// When the player took the seat.
    pub created_at: SystemTime,
}

/// Aggregate match document persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Primary key of the match.
    pub id: Uuid,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Question snapshot, set once at activation.
    pub questions: Option<Vec<QuestionSnapshotEntity>>,
    /// One or two progress rows, ordered by role.
    pub players: Vec<PlayerProgressEntity>,
    /// When the first player opened the match.
    pub created_at: SystemTime,
    /// Activation instant.
    pub started_at: Option<SystemTime>,
    /// Finalization instant.
    pub finished_at: Option<SystemTime>,
    /// Instant after which the match must be force-finalized.
    pub grace_deadline: Option<SystemTime>,
    /// Progress id of the player who answered all questions first.
    pub fastest_finisher: Option<Uuid>,
    /// Optimistic concurrency counter, bumped by every update.
    pub version: u64,
}

/// Question stored in the question bank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Primary key of the question.
    pub id: Uuid,
    /// Question text shown to players.
    pub body: String,
    /// Accepted answers, matched exactly.
    pub correct_answers: Vec<String>,
    /// Whether the question can be drawn into new matches.
    pub published: bool,
    /// Creation instant.
    pub created_at: SystemTime,
    /// Last edit, if any.
    pub updated_at: Option<SystemTime>,
    /// Soft-delete marker; deleted questions are invisible to every query.
    pub deleted_at: Option<SystemTime>,
}

impl QuestionEntity {
    /// Whether the question may be drawn into a new match.
    pub fn is_drawable(&self) -> bool {
        self.published && self.deleted_at.is_none()
    }
}

impl From<&QuestionEntity> for QuestionSnapshotEntity {
    fn from(question: &QuestionEntity) -> Self {
        Self {
            id: question.id,
            body: question.body.clone(),
            correct_answers: question.correct_answers.clone(),
        }
    }
}
