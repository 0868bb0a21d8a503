use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{
    AnswerEntity, AnswerVerdict, MatchEntity, MatchStatus, PlayerProgressEntity, PlayerRole,
    QuestionEntity, QuestionSnapshotEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    id: String,
    status: MatchStatus,
    questions: Option<Vec<MongoSnapshotDocument>>,
    players: Vec<MongoProgressDocument>,
    created_at: DateTime,
    started_at: Option<DateTime>,
    finished_at: Option<DateTime>,
    grace_deadline: Option<DateTime>,
    fastest_finisher: Option<String>,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoSnapshotDocument {
    id: String,
    body: String,
    correct_answers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoProgressDocument {
    id: String,
    player_id: String,
    player_login: String,
    role: PlayerRole,
    cursor: i32,
    score: i32,
    answers: Vec<MongoAnswerDocument>,
    created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoAnswerDocument {
    id: String,
    question_id: String,
    verdict: AnswerVerdict,
    #[serde(default)]
    request_id: Option<String>,
    created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuestionDocument {
    #[serde(rename = "_id")]
    id: String,
    body: String,
    correct_answers: Vec<String>,
    published: bool,
    created_at: DateTime,
    updated_at: Option<DateTime>,
    deleted_at: Option<DateTime>,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id.to_string(),
            status: value.status,
            questions: value.questions.map(|questions| {
                questions
                    .into_iter()
                    .map(|q| MongoSnapshotDocument {
                        id: q.id.to_string(),
                        body: q.body,
                        correct_answers: q.correct_answers,
                    })
                    .collect()
            }),
            players: value.players.into_iter().map(Into::into).collect(),
            created_at: DateTime::from_system_time(value.created_at),
            started_at: value.started_at.map(DateTime::from_system_time),
            finished_at: value.finished_at.map(DateTime::from_system_time),
            grace_deadline: value.grace_deadline.map(DateTime::from_system_time),
            fastest_finisher: value.fastest_finisher.map(|id| id.to_string()),
            version: value.version as i64,
        }
    }
}

impl From<PlayerProgressEntity> for MongoProgressDocument {
    fn from(value: PlayerProgressEntity) -> Self {
        Self {
            id: value.id.to_string(),
            player_id: value.player_id,
            player_login: value.player_login,
            role: value.role,
            cursor: value.cursor as i32,
            score: value.score as i32,
            answers: value
                .answers
                .into_iter()
                .map(|a| MongoAnswerDocument {
                    id: a.id.to_string(),
                    question_id: a.question_id.to_string(),
                    verdict: a.verdict,
                    request_id: a.request_id,
                    created_at: DateTime::from_system_time(a.created_at),
                })
                .collect(),
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoMatchDocument> for MatchEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoMatchDocument) -> MongoResult<Self> {
        let id = parse_id(&value.id)?;
        let questions = value
            .questions
            .map(|questions| {
                questions
                    .into_iter()
                    .map(|q| {
                        Ok(QuestionSnapshotEntity {
                            id: parse_id(&q.id)?,
                            body: q.body,
                            correct_answers: q.correct_answers,
                        })
                    })
                    .collect::<MongoResult<Vec<_>>>()
            })
            .transpose()?;
        let players = value
            .players
            .into_iter()
            .map(PlayerProgressEntity::try_from)
            .collect::<MongoResult<Vec<_>>>()?;
        let fastest_finisher = value
            .fastest_finisher
            .as_deref()
            .map(parse_id)
            .transpose()?;

        Ok(Self {
            id,
            status: value.status,
            questions,
            players,
            created_at: value.created_at.to_system_time(),
            started_at: value.started_at.map(DateTime::to_system_time),
            finished_at: value.finished_at.map(DateTime::to_system_time),
            grace_deadline: value.grace_deadline.map(DateTime::to_system_time),
            fastest_finisher,
            version: u64::try_from(value.version).map_err(|_| {
                MongoDaoError::MalformedDocument {
                    id: value.id.clone(),
                    reason: "negative version",
                }
            })?,
        })
    }
}

impl TryFrom<MongoProgressDocument> for PlayerProgressEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoProgressDocument) -> MongoResult<Self> {
        let answers = value
            .answers
            .into_iter()
            .map(|a| {
                Ok(AnswerEntity {
                    id: parse_id(&a.id)?,
                    question_id: parse_id(&a.question_id)?,
                    verdict: a.verdict,
                    request_id: a.request_id,
                    created_at: a.created_at.to_system_time(),
                })
            })
            .collect::<MongoResult<Vec<_>>>()?;

        Ok(Self {
            id: parse_id(&value.id)?,
            player_id: value.player_id,
            player_login: value.player_login,
            role: value.role,
            cursor: non_negative(&value.id, value.cursor)?,
            score: non_negative(&value.id, value.score)?,
            answers,
            created_at: value.created_at.to_system_time(),
        })
    }
}

impl From<QuestionEntity> for MongoQuestionDocument {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            body: value.body,
            correct_answers: value.correct_answers,
            published: value.published,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: value.updated_at.map(DateTime::from_system_time),
            deleted_at: value.deleted_at.map(DateTime::from_system_time),
        }
    }
}

impl TryFrom<MongoQuestionDocument> for QuestionEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoQuestionDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(&value.id)?,
            body: value.body,
            correct_answers: value.correct_answers,
            published: value.published,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.map(DateTime::to_system_time),
            deleted_at: value.deleted_at.map(DateTime::to_system_time),
        })
    }
}

/// Projection of a match document onto its `_id`.
#[derive(Debug, Deserialize)]
pub struct MongoIdDocument {
    #[serde(rename = "_id")]
    id: String,
}

impl MongoIdDocument {
    pub fn into_id(self) -> MongoResult<Uuid> {
        parse_id(&self.id)
    }
}

fn parse_id(raw: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| MongoDaoError::MalformedDocument {
        id: raw.to_owned(),
        reason: "invalid uuid",
    })
}

fn non_negative(id: &str, value: i32) -> MongoResult<u32> {
    u32::try_from(value).map_err(|_| MongoDaoError::MalformedDocument {
        id: id.to_owned(),
        reason: "negative counter",
    })
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}
