use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{AnswerVerdict, MatchStatus, PlayerRole},
    dto::{
        common::{SortDirection, default_page_number, default_page_size},
        format_system_time,
        validation::validate_request_id,
    },
    error::ServiceError,
    state::quiz_match::{Answer, PlayerProgress, PlayerRef, QuestionSnapshot, QuizMatch},
};

/// Largest page accepted by the leaderboard.
pub const TOP_MAX_PAGE_SIZE: u64 = 50;

/// Answer submitted for the caller's active question.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    /// Answer text, compared exactly.
    pub answer: String,
    /// Optional client token; resending the same token returns the stored answer.
    #[serde(default)]
    pub request_id: Option<String>,
}

impl Validate for SubmitAnswerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(ref request_id) = self.request_id {
            if let Err(e) = validate_request_id(request_id) {
                errors.add("requestId", e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Verdict as exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum AnswerStatusView {
    /// Answer matched an accepted answer.
    Correct,
    /// Answer matched no accepted answer, or was auto-filled.
    Incorrect,
}

impl From<AnswerVerdict> for AnswerStatusView {
    fn from(value: AnswerVerdict) -> Self {
        match value {
            AnswerVerdict::Correct => AnswerStatusView::Correct,
            AnswerVerdict::Incorrect => AnswerStatusView::Incorrect,
        }
    }
}

/// Recorded answer as exposed to players.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    /// Question the answer refers to.
    pub question_id: Uuid,
    /// Verdict.
    pub answer_status: AnswerStatusView,
    /// RFC 3339 timestamp of the submission.
    pub added_at: String,
}

impl From<&Answer> for AnswerView {
    fn from(answer: &Answer) -> Self {
        Self {
            question_id: answer.question_id,
            answer_status: answer.verdict.into(),
            added_at: format_system_time(answer.created_at),
        }
    }
}

/// Player identity in views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlayerView {
    /// Player identifier.
    pub id: String,
    /// Display login.
    pub login: String,
}

impl From<&PlayerRef> for PlayerView {
    fn from(player: &PlayerRef) -> Self {
        Self {
            id: player.id.clone(),
            login: player.login.clone(),
        }
    }
}

/// One player's side of a match.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerProgressView {
    /// Answers in the order they were recorded.
    pub answers: Vec<AnswerView>,
    /// Who plays this side.
    pub player: PlayerView,
    /// Current score.
    pub score: u32,
}

impl From<&PlayerProgress> for PlayerProgressView {
    fn from(progress: &PlayerProgress) -> Self {
        let mut answers: Vec<&Answer> = progress.answers().iter().collect();
        answers.sort_by_key(|answer| answer.created_at);
        Self {
            answers: answers.into_iter().map(AnswerView::from).collect(),
            player: (&progress.player).into(),
            score: progress.score(),
        }
    }
}

/// Question of a match. Accepted answers are only revealed once the match is finished.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchQuestionView {
    /// Question identifier.
    pub id: Uuid,
    /// Question text.
    pub body: String,
    /// Accepted answers, present once the match is finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<Vec<String>>,
}

impl MatchQuestionView {
    fn from_snapshot(question: &QuestionSnapshot, reveal: bool) -> Self {
        Self {
            id: question.id,
            body: question.body.clone(),
            correct_answers: reveal.then(|| question.correct_answers.clone()),
        }
    }
}

/// Match status as exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum MatchStatusView {
    /// Waiting for an opponent.
    PendingSecondPlayer,
    /// Both players seated, questions being answered.
    Active,
    /// Closed; no further changes.
    Finished,
}

impl From<MatchStatus> for MatchStatusView {
    fn from(value: MatchStatus) -> Self {
        match value {
            MatchStatus::Pending => MatchStatusView::PendingSecondPlayer,
            MatchStatus::Active => MatchStatusView::Active,
            MatchStatus::Finished => MatchStatusView::Finished,
        }
    }
}

/// Denormalized match returned by every match route.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    /// Match identifier.
    pub id: Uuid,
    /// Missing only for malformed matches.
    pub first_player_progress: Option<PlayerProgressView>,
    /// Missing while the match waits for an opponent.
    pub second_player_progress: Option<PlayerProgressView>,
    /// Null until a second player joins.
    pub questions: Option<Vec<MatchQuestionView>>,
    /// Lifecycle status.
    pub status: MatchStatusView,
    /// RFC 3339 creation timestamp.
    pub pair_created_date: String,
    /// RFC 3339 activation timestamp.
    pub start_game_date: Option<String>,
    /// RFC 3339 finalization timestamp.
    pub finish_game_date: Option<String>,
}

impl From<&QuizMatch> for MatchView {
    fn from(quiz_match: &QuizMatch) -> Self {
        let reveal = quiz_match.status == MatchStatus::Finished;
        Self {
            id: quiz_match.id,
            first_player_progress: quiz_match
                .progress_by_role(PlayerRole::First)
                .map(Into::into),
            second_player_progress: quiz_match
                .progress_by_role(PlayerRole::Second)
                .map(Into::into),
            questions: quiz_match.questions.as_ref().map(|questions| {
                questions
                    .iter()
                    .map(|question| MatchQuestionView::from_snapshot(question, reveal))
                    .collect()
            }),
            status: quiz_match.status.into(),
            pair_created_date: format_system_time(quiz_match.created_at),
            start_game_date: quiz_match.started_at.map(format_system_time),
            finish_game_date: quiz_match.finished_at.map(format_system_time),
        }
    }
}

/// Sort key of the match history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum MatchSortBy {
    /// Status label.
    Status,
    /// Creation instant.
    #[default]
    PairCreatedDate,
    /// Activation instant.
    StartGameDate,
    /// Finalization instant.
    FinishGameDate,
}

/// Query string of `GET /pair-game-quiz/pairs/my`.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MyMatchesQuery {
    /// Sort key.
    #[serde(default)]
    pub sort_by: MatchSortBy,
    /// Sort direction.
    #[serde(default)]
    pub sort_direction: SortDirection,
    /// 1-based page number.
    #[serde(default = "default_page_number")]
    #[validate(range(min = 1))]
    pub page_number: u64,
    /// Items per page.
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub page_size: u64,
}

/// Leaderboard column usable in `sort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopSortField {
    /// Average points per match.
    AvgScores,
    /// Total points.
    SumScore,
    /// Matches won.
    WinsCount,
    /// Matches lost.
    LossesCount,
    /// Matches drawn.
    DrawsCount,
    /// Matches played.
    GamesCount,
}

impl TopSortField {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "avgScores" => Some(TopSortField::AvgScores),
            "sumScore" => Some(TopSortField::SumScore),
            "winsCount" => Some(TopSortField::WinsCount),
            "lossesCount" => Some(TopSortField::LossesCount),
            "drawsCount" => Some(TopSortField::DrawsCount),
            "gamesCount" => Some(TopSortField::GamesCount),
            _ => None,
        }
    }
}

/// Parsed query string of `GET /pair-game-quiz/users/top`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopQuery {
    /// Sort columns in priority order.
    pub sort: Vec<(TopSortField, SortDirection)>,
    /// 1-based page number.
    pub page_number: u64,
    /// Items per page, capped at [`TOP_MAX_PAGE_SIZE`].
    pub page_size: u64,
}

impl Default for TopQuery {
    fn default() -> Self {
        Self {
            sort: vec![
                (TopSortField::AvgScores, SortDirection::Desc),
                (TopSortField::SumScore, SortDirection::Desc),
            ],
            page_number: default_page_number(),
            page_size: default_page_size(),
        }
    }
}

impl TopQuery {
    /// Build the query from raw key/value pairs; `sort` may repeat (`sort=avgScores desc`).
    ///
    /// Unknown sort columns are ignored and a missing direction means descending.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, ServiceError> {
        let mut query = TopQuery::default();
        let mut sort = Vec::new();

        for (key, value) in pairs {
            match key.as_str() {
                "sort" => {
                    let mut parts = value.split_whitespace();
                    let Some(field) = parts.next().and_then(TopSortField::parse) else {
                        continue;
                    };
                    let direction = match parts.next() {
                        Some(dir) if dir.eq_ignore_ascii_case("asc") => SortDirection::Asc,
                        _ => SortDirection::Desc,
                    };
                    sort.push((field, direction));
                }
                "pageNumber" => query.page_number = parse_positive(&key, &value)?,
                "pageSize" => query.page_size = parse_positive(&key, &value)?,
                _ => {}
            }
        }

        if !sort.is_empty() {
            query.sort = sort;
        }
        query.page_size = query.page_size.min(TOP_MAX_PAGE_SIZE);
        Ok(query)
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64, ServiceError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|parsed| *parsed > 0)
        .ok_or_else(|| ServiceError::InvalidInput(format!("{key} must be a positive integer")))
}

/// Aggregated results of a player over finished matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsView {
    /// Points over all finished matches.
    pub sum_score: u64,
    /// Mean score per match, rounded to two decimals.
    pub avg_scores: f64,
    /// Finished matches played.
    pub games_count: u64,
    /// Matches won.
    pub wins_count: u64,
    /// Matches lost.
    pub losses_count: u64,
    /// Matches drawn.
    pub draws_count: u64,
}

/// Leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopPlayerView {
    /// Points over all finished matches.
    pub sum_score: u64,
    /// Average points per match, two decimals.
    pub avg_scores: f64,
    /// Finished matches played.
    pub games_count: u64,
    /// Matches won.
    pub wins_count: u64,
    /// Matches lost.
    pub losses_count: u64,
    /// Matches drawn.
    pub draws_count: u64,
    /// Player the row belongs to.
    pub player: PlayerView,
}

impl TopPlayerView {
    /// Leaderboard row for `player`.
    pub fn new(player: PlayerView, stats: StatisticsView) -> Self {
        Self {
            sum_score: stats.sum_score,
            avg_scores: stats.avg_scores,
            games_count: stats.games_count,
            wins_count: stats.wins_count,
            losses_count: stats.losses_count,
            draws_count: stats.draws_count,
            player,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use crate::dto::common::Paginated;

    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn top_query_defaults() {
        let query = TopQuery::from_pairs(Vec::new()).unwrap();
        assert_eq!(query, TopQuery::default());
    }

    #[test]
    fn top_query_parses_repeated_sort_and_ignores_unknown_columns() {
        let query = TopQuery::from_pairs(pairs(&[
            ("sort", "winsCount asc"),
            ("sort", "bogus desc"),
            ("sort", "sumScore"),
            ("pageSize", "500"),
            ("pageNumber", "2"),
        ]))
        .unwrap();
        assert_eq!(
            query.sort,
            vec![
                (TopSortField::WinsCount, SortDirection::Asc),
                (TopSortField::SumScore, SortDirection::Desc),
            ]
        );
        assert_eq!(query.page_size, TOP_MAX_PAGE_SIZE);
        assert_eq!(query.page_number, 2);
    }

    #[test]
    fn top_query_rejects_non_numeric_page() {
        assert!(TopQuery::from_pairs(pairs(&[("pageNumber", "first")])).is_err());
        assert!(TopQuery::from_pairs(pairs(&[("pageSize", "0")])).is_err());
    }

    #[test]
    fn top_query_with_max_page_number_pages_past_the_end() {
        let max = u64::MAX.to_string();
        let query = TopQuery::from_pairs(pairs(&[("pageNumber", max.as_str())])).unwrap();
        let page = Paginated::from_sorted(vec![1, 2, 3], query.page_number, query.page_size);
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn correct_answers_hidden_until_finished() {
        let now = SystemTime::now();
        let player = |id: &str| PlayerRef {
            id: id.into(),
            login: id.into(),
        };
        let questions = (0..5)
            .map(|i| QuestionSnapshot {
                id: Uuid::new_v4(),
                body: format!("question {i}"),
                correct_answers: vec!["yes".into()],
            })
            .collect();
        let mut quiz_match = QuizMatch::open(player("alice"), now);
        let pending = MatchView::from(&quiz_match);
        assert_eq!(pending.status, MatchStatusView::PendingSecondPlayer);
        assert!(pending.questions.is_none());
        assert!(pending.second_player_progress.is_none());

        quiz_match.activate(player("bob"), questions, now).unwrap();
        let active = MatchView::from(&quiz_match);
        assert!(
            active
                .questions
                .as_ref()
                .unwrap()
                .iter()
                .all(|q| q.correct_answers.is_none())
        );

        quiz_match
            .finalize(crate::state::state_machine::FinishReason::GraceExpired, now)
            .unwrap();
        let finished = MatchView::from(&quiz_match);
        assert!(
            finished
                .questions
                .unwrap()
                .iter()
                .all(|q| q.correct_answers.as_deref() == Some(&["yes".to_owned()][..]))
        );
        assert_eq!(finished.first_player_progress.unwrap().answers.len(), 5);
    }

    #[test]
    fn blank_request_id_is_rejected() {
        let request = SubmitAnswerRequest {
            answer: "x".into(),
            request_id: Some(" ".into()),
        };
        assert!(request.validate().is_err());
        let request = SubmitAnswerRequest {
            answer: String::new(),
            request_id: None,
        };
        assert!(request.validate().is_ok());
    }
}
