//! Read-only projections over matches: single match views, history, statistics and the
//! leaderboard. None of these take match locks.

use std::cmp::Ordering;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    dao::models::{MatchEntity, MatchStatus},
    dto::{
        common::{Paginated, SortDirection},
        quiz_match::{
            MatchSortBy, MatchStatusView, MatchView, MyMatchesQuery, PlayerView, StatisticsView,
            TopPlayerView, TopQuery, TopSortField,
        },
    },
    error::ServiceError,
    state::{SharedState, quiz_match::QuizMatch},
};

/// Fetch a match the caller takes part in.
pub async fn get_by_id(
    state: &SharedState,
    player_id: &str,
    id: Uuid,
) -> Result<MatchView, ServiceError> {
    let store = state.require_quiz_store().await?;
    let quiz_match = store
        .find_match(id)
        .await?
        .map(QuizMatch::from)
        .ok_or_else(|| ServiceError::NotFound(format!("match `{id}` not found")))?;

    if !quiz_match.has_player(player_id) {
        return Err(ServiceError::Forbidden(format!(
            "player `{player_id}` does not take part in match `{id}`"
        )));
    }

    Ok(MatchView::from(&quiz_match))
}

/// Pending or active match of the caller.
pub async fn get_current(state: &SharedState, player_id: &str) -> Result<MatchView, ServiceError> {
    let store = state.require_quiz_store().await?;
    let entity = store
        .find_open_match_for_player(player_id.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound("player has no open match".into()))?;

    Ok(MatchView::from(&QuizMatch::from(entity)))
}

/// Paginated history of the caller's matches.
pub async fn list_my_matches(
    state: &SharedState,
    player_id: &str,
    query: MyMatchesQuery,
) -> Result<Paginated<MatchView>, ServiceError> {
    let store = state.require_quiz_store().await?;
    let mut matches: Vec<QuizMatch> = store
        .list_matches_for_player(player_id.to_owned())
        .await?
        .into_iter()
        .map(QuizMatch::from)
        .collect();

    matches.sort_by(|a, b| compare_matches(a, b, query.sort_by, query.sort_direction));

    let views = matches.iter().map(MatchView::from).collect();
    Ok(Paginated::from_sorted(
        views,
        query.page_number,
        query.page_size,
    ))
}

fn compare_matches(
    a: &QuizMatch,
    b: &QuizMatch,
    sort_by: MatchSortBy,
    direction: SortDirection,
) -> Ordering {
    let primary = match sort_by {
        MatchSortBy::Status => direction.apply(status_label(a.status).cmp(status_label(b.status))),
        MatchSortBy::PairCreatedDate => direction.apply(a.created_at.cmp(&b.created_at)),
        MatchSortBy::StartGameDate => nulls_last(a.started_at, b.started_at, direction),
        MatchSortBy::FinishGameDate => nulls_last(a.finished_at, b.finished_at, direction),
    };

    let secondary = match sort_by {
        MatchSortBy::Status => b.created_at.cmp(&a.created_at),
        _ => Ordering::Equal,
    };

    primary.then(secondary).then_with(|| a.id.cmp(&b.id))
}

/// Status ordering follows the public labels.
fn status_label(status: MatchStatus) -> &'static str {
    match MatchStatusView::from(status) {
        MatchStatusView::PendingSecondPlayer => "PendingSecondPlayer",
        MatchStatusView::Active => "Active",
        MatchStatusView::Finished => "Finished",
    }
}

fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Running win/loss/draw totals of one player.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    sum_score: u64,
    games: u64,
    wins: u64,
    losses: u64,
    draws: u64,
}

impl Tally {
    fn record(&mut self, own: u32, rival: u32) {
        self.sum_score += u64::from(own);
        self.games += 1;
        match own.cmp(&rival) {
            Ordering::Greater => self.wins += 1,
            Ordering::Less => self.losses += 1,
            Ordering::Equal => self.draws += 1,
        }
    }

    fn into_view(self) -> StatisticsView {
        let avg_scores = if self.games == 0 {
            0.0
        } else {
            (self.sum_score as f64 / self.games as f64 * 100.0).round() / 100.0
        };
        StatisticsView {
            sum_score: self.sum_score,
            avg_scores,
            games_count: self.games,
            wins_count: self.wins,
            losses_count: self.losses,
            draws_count: self.draws,
        }
    }
}

/// Visit `(player id, login, own score, rival score)` for both seats of a finished match.
fn for_each_result(entity: &MatchEntity, mut visit: impl FnMut(&str, &str, u32, u32)) {
    if entity.status != MatchStatus::Finished {
        return;
    }
    let [first, second] = entity.players.as_slice() else {
        return;
    };
    visit(&first.player_id, &first.player_login, first.score, second.score);
    visit(&second.player_id, &second.player_login, second.score, first.score);
}

/// Aggregate results of the caller over finished matches.
pub async fn get_statistics(
    state: &SharedState,
    player_id: &str,
) -> Result<StatisticsView, ServiceError> {
    let store = state.require_quiz_store().await?;
    let matches = store.list_matches_for_player(player_id.to_owned()).await?;

    let mut tally = Tally::default();
    for entity in &matches {
        for_each_result(entity, |id, _, own, rival| {
            if id == player_id {
                tally.record(own, rival);
            }
        });
    }

    Ok(tally.into_view())
}

/// Leaderboard over every finished match.
pub async fn get_top(state: &SharedState, query: TopQuery) -> Result<Paginated<TopPlayerView>, ServiceError> {
    let store = state.require_quiz_store().await?;
    let matches = store.list_finished_matches().await?;
    Ok(build_top(&matches, &query))
}

fn build_top(matches: &[MatchEntity], query: &TopQuery) -> Paginated<TopPlayerView> {
    let mut tallies: IndexMap<String, (String, Tally)> = IndexMap::new();
    for entity in matches {
        for_each_result(entity, |id, login, own, rival| {
            tallies
                .entry(id.to_owned())
                .or_insert_with(|| (login.to_owned(), Tally::default()))
                .1
                .record(own, rival);
        });
    }

    let mut rows: Vec<TopPlayerView> = tallies
        .into_iter()
        .map(|(id, (login, tally))| TopPlayerView::new(PlayerView { id, login }, tally.into_view()))
        .collect();

    rows.sort_by(|a, b| {
        query
            .sort
            .iter()
            .map(|(field, direction)| direction.apply(compare_field(a, b, *field)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.player.login.cmp(&b.player.login))
            .then_with(|| a.player.id.cmp(&b.player.id))
    });

    Paginated::from_sorted(rows, query.page_number, query.page_size)
}

fn compare_field(a: &TopPlayerView, b: &TopPlayerView, field: TopSortField) -> Ordering {
    match field {
        TopSortField::AvgScores => a.avg_scores.total_cmp(&b.avg_scores),
        TopSortField::SumScore => a.sum_score.cmp(&b.sum_score),
        TopSortField::WinsCount => a.wins_count.cmp(&b.wins_count),
        TopSortField::LossesCount => a.losses_count.cmp(&b.losses_count),
        TopSortField::DrawsCount => a.draws_count.cmp(&b.draws_count),
        TopSortField::GamesCount => a.games_count.cmp(&b.games_count),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        time::{Duration, SystemTime},
    };

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{PlayerProgressEntity, PlayerRole},
            quiz_store::{QuizStore, memory::InMemoryQuizStore},
        },
        services::{
            matchmaking_service::create_or_join,
            test_support::{finish_match, player, seed_questions},
        },
        state::AppState,
    };

    fn progress(player_id: &str, role: PlayerRole, score: u32) -> PlayerProgressEntity {
        PlayerProgressEntity {
            id: Uuid::new_v4(),
            player_id: player_id.into(),
            player_login: format!("{player_id}-login"),
            role,
            cursor: 5,
            score,
            answers: Vec::new(),
            created_at: SystemTime::now(),
        }
    }

    fn finished(first: (&str, u32), second: (&str, u32)) -> MatchEntity {
        let now = SystemTime::now();
        MatchEntity {
            id: Uuid::new_v4(),
            status: MatchStatus::Finished,
            questions: Some(Vec::new()),
            players: vec![
                progress(first.0, PlayerRole::First, first.1),
                progress(second.0, PlayerRole::Second, second.1),
            ],
            created_at: now,
            started_at: Some(now),
            finished_at: Some(now),
            grace_deadline: None,
            fastest_finisher: None,
            version: 2,
        }
    }

    #[tokio::test]
    async fn outsiders_cannot_read_a_match() {
        let store = InMemoryQuizStore::new();
        seed_questions(&store, 5).await;
        let state = AppState::with_store(AppConfig::default(), Arc::new(store));

        let view = create_or_join(&state, player("alice")).await.unwrap();
        assert_eq!(get_by_id(&state, "alice", view.id).await.unwrap().id, view.id);
        assert!(matches!(
            get_by_id(&state, "mallory", view.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            get_by_id(&state, "alice", Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn current_match_disappears_once_finished() {
        let store = InMemoryQuizStore::new();
        seed_questions(&store, 5).await;
        let state = AppState::with_store(AppConfig::default(), Arc::new(store));

        assert!(matches!(
            get_current(&state, "alice").await,
            Err(ServiceError::NotFound(_))
        ));
        create_or_join(&state, player("alice")).await.unwrap();
        let active = create_or_join(&state, player("bob")).await.unwrap();
        assert_eq!(get_current(&state, "alice").await.unwrap().id, active.id);

        finish_match(&state, active.id).await;
        assert!(get_current(&state, "bob").await.is_err());

        let history = list_my_matches(
            &state,
            "bob",
            MyMatchesQuery {
                sort_by: MatchSortBy::Status,
                sort_direction: SortDirection::Desc,
                page_number: 1,
                page_size: 10,
            },
        )
        .await
        .unwrap();
        assert_eq!(history.total_count, 1);
        assert_eq!(history.items[0].status, MatchStatusView::Finished);
    }

    #[test]
    fn history_sorts_missing_dates_last() {
        let now = SystemTime::now();
        let mut older = QuizMatch::open(player("alice"), now);
        older.started_at = Some(now);
        let mut newer = QuizMatch::open(player("alice"), now + Duration::from_secs(1));
        newer.started_at = Some(now + Duration::from_secs(1));
        let pending = QuizMatch::open(player("alice"), now + Duration::from_secs(2));

        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let mut list = vec![pending.clone(), newer.clone(), older.clone()];
            list.sort_by(|a, b| compare_matches(a, b, MatchSortBy::StartGameDate, direction));
            assert_eq!(list[2].id, pending.id);
        }

        let mut list = vec![older.clone(), pending.clone(), newer.clone()];
        list.sort_by(|a, b| compare_matches(a, b, MatchSortBy::Status, SortDirection::Asc));
        // Same status: newest first.
        assert_eq!(list.iter().map(|m| m.id).collect::<Vec<_>>(), vec![
            pending.id, newer.id, older.id
        ]);
    }

    #[tokio::test]
    async fn statistics_compare_against_rival_score() {
        let store = InMemoryQuizStore::new();
        for entity in [
            finished(("alice", 4), ("bob", 2)),
            finished(("bob", 3), ("alice", 3)),
            finished(("carol", 5), ("alice", 1)),
        ] {
            store.insert_match(entity).await.unwrap();
        }
        let state = AppState::with_store(AppConfig::default(), Arc::new(store));

        let stats = get_statistics(&state, "alice").await.unwrap();
        assert_eq!(stats, StatisticsView {
            sum_score: 8,
            avg_scores: 2.67,
            games_count: 3,
            wins_count: 1,
            losses_count: 1,
            draws_count: 1,
        });
        assert_eq!(
            get_statistics(&state, "nobody").await.unwrap(),
            StatisticsView::default()
        );
    }

    #[test]
    fn leaderboard_orders_by_requested_columns_then_login() {
        let matches = vec![
            finished(("alice", 4), ("bob", 4)),
            finished(("carol", 4), ("dave", 1)),
            finished(("bob", 2), ("dave", 0)),
        ];

        let top = build_top(&matches, &TopQuery::default());
        let ids: Vec<&str> = top.items.iter().map(|row| row.player.id.as_str()).collect();
        // alice and carol tie on avg 4 and sum 4; login breaks the tie.
        assert_eq!(ids, vec!["alice", "carol", "bob", "dave"]);
        assert_eq!(top.items[2].avg_scores, 3.0);
        assert_eq!(top.items[2].wins_count, 1);
        assert_eq!(top.items[2].draws_count, 1);
        assert_eq!(top.total_count, 4);

        let query = TopQuery {
            sort: vec![(TopSortField::GamesCount, SortDirection::Desc)],
            page_number: 1,
            page_size: 2,
        };
        let top = build_top(&matches, &query);
        let ids: Vec<&str> = top.items.iter().map(|row| row.player.id.as_str()).collect();
        assert_eq!(ids, vec!["bob", "dave"]);
        assert_eq!(top.pages_count, 2);
    }
}
