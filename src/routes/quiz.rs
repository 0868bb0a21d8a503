use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        common::Paginated,
        quiz_match::{
            AnswerView, MatchView, MyMatchesQuery, StatisticsView, SubmitAnswerRequest,
            TopPlayerView, TopQuery,
        },
    },
    error::AppError,
    routes::identity::AuthenticatedPlayer,
    services::{answer_service, match_query_service, matchmaking_service},
    state::SharedState,
};

/// Player-facing match routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/pair-game-quiz/pairs/connection", post(connect))
        .route("/pair-game-quiz/pairs/my-current", get(my_current))
        .route("/pair-game-quiz/pairs/my-current/answers", post(submit_answer))
        .route("/pair-game-quiz/pairs/my", get(my_matches))
        .route("/pair-game-quiz/pairs/{id}", get(match_by_id))
        .route("/pair-game-quiz/users/my-statistic", get(my_statistic))
        .route("/pair-game-quiz/users/top", get(top_players))
}

/// Join the oldest pending match or open a new one.
#[utoipa::path(
    post,
    path = "/pair-game-quiz/pairs/connection",
    tag = "quiz",
    params(("x-player-id" = String, Header, description = "Authenticated player id")),
    responses(
        (status = 200, description = "Joined or opened match", body = MatchView),
        (status = 403, description = "Player already takes part in an open match"),
        (status = 409, description = "Not enough published questions")
    )
)]
pub async fn connect(
    State(state): State<SharedState>,
    AuthenticatedPlayer(player): AuthenticatedPlayer,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(matchmaking_service::create_or_join(&state, player).await?))
}

/// Answer the next question of the caller's active match.
#[utoipa::path(
    post,
    path = "/pair-game-quiz/pairs/my-current/answers",
    tag = "quiz",
    params(("x-player-id" = String, Header, description = "Authenticated player id")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = AnswerView),
        (status = 403, description = "No active match, no question left, or grace window over")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    AuthenticatedPlayer(player): AuthenticatedPlayer,
    Valid(Json(payload)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<AnswerView>, AppError> {
    Ok(Json(
        answer_service::submit_answer(&state, &player.id, payload).await?,
    ))
}

/// Pending or active match of the caller.
#[utoipa::path(
    get,
    path = "/pair-game-quiz/pairs/my-current",
    tag = "quiz",
    params(("x-player-id" = String, Header, description = "Authenticated player id")),
    responses(
        (status = 200, description = "Open match", body = MatchView),
        (status = 404, description = "No open match")
    )
)]
pub async fn my_current(
    State(state): State<SharedState>,
    AuthenticatedPlayer(player): AuthenticatedPlayer,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(match_query_service::get_current(&state, &player.id).await?))
}

/// Every match of the caller, paginated.
#[utoipa::path(
    get,
    path = "/pair-game-quiz/pairs/my",
    tag = "quiz",
    params(
        ("x-player-id" = String, Header, description = "Authenticated player id"),
        MyMatchesQuery
    ),
    responses((status = 200, description = "Match history", body = Paginated<MatchView>))
)]
pub async fn my_matches(
    State(state): State<SharedState>,
    AuthenticatedPlayer(player): AuthenticatedPlayer,
    Valid(Query(query)): Valid<Query<MyMatchesQuery>>,
) -> Result<Json<Paginated<MatchView>>, AppError> {
    Ok(Json(
        match_query_service::list_my_matches(&state, &player.id, query).await?,
    ))
}

/// Match by id, readable by its players only.
#[utoipa::path(
    get,
    path = "/pair-game-quiz/pairs/{id}",
    tag = "quiz",
    params(
        ("x-player-id" = String, Header, description = "Authenticated player id"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    responses(
        (status = 200, description = "Match", body = MatchView),
        (status = 403, description = "Caller does not take part in the match"),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn match_by_id(
    State(state): State<SharedState>,
    AuthenticatedPlayer(player): AuthenticatedPlayer,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchView>, AppError> {
    Ok(Json(
        match_query_service::get_by_id(&state, &player.id, id).await?,
    ))
}

/// Results of the caller over finished matches.
#[utoipa::path(
    get,
    path = "/pair-game-quiz/users/my-statistic",
    tag = "quiz",
    params(("x-player-id" = String, Header, description = "Authenticated player id")),
    responses((status = 200, description = "Statistics", body = StatisticsView))
)]
pub async fn my_statistic(
    State(state): State<SharedState>,
    AuthenticatedPlayer(player): AuthenticatedPlayer,
) -> Result<Json<StatisticsView>, AppError> {
    Ok(Json(
        match_query_service::get_statistics(&state, &player.id).await?,
    ))
}

/// Leaderboard over all finished matches.
#[utoipa::path(
    get,
    path = "/pair-game-quiz/users/top",
    tag = "quiz",
    params(
        ("sort" = Option<Vec<String>>, Query, description = "Repeatable `column direction`, default `avgScores desc` then `sumScore desc`"),
        ("pageNumber" = Option<u64>, Query, description = "1-based page"),
        ("pageSize" = Option<u64>, Query, description = "Page size, at most 50")
    ),
    responses((status = 200, description = "Leaderboard", body = Paginated<TopPlayerView>))
)]
pub async fn top_players(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Paginated<TopPlayerView>>, AppError> {
    let query = TopQuery::from_pairs(pairs)?;
    Ok(Json(match_query_service::get_top(&state, query).await?))
}
