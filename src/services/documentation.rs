use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the quiz duel backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::quiz::connect,
        crate::routes::quiz::submit_answer,
        crate::routes::quiz::my_current,
        crate::routes::quiz::my_matches,
        crate::routes::quiz::match_by_id,
        crate::routes::quiz::my_statistic,
        crate::routes::quiz::top_players,
        crate::routes::questions::list_questions,
        crate::routes::questions::create_question,
        crate::routes::questions::update_question,
        crate::routes::questions::publish_question,
        crate::routes::questions::delete_question,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::quiz_match::MatchView,
            crate::dto::quiz_match::AnswerView,
            crate::dto::quiz_match::SubmitAnswerRequest,
            crate::dto::quiz_match::StatisticsView,
            crate::dto::quiz_match::TopPlayerView,
            crate::dto::quiz_match::MatchSortBy,
            crate::dto::common::SortDirection,
            crate::dto::question::QuestionInput,
            crate::dto::question::QuestionView,
            crate::dto::question::PublishQuestionRequest,
            crate::dto::question::PublishedStatus,
            crate::dto::question::QuestionSortBy,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "quiz", description = "Two-player quiz matches"),
        (name = "questions", description = "Question bank administration"),
    )
)]
/// OpenAPI document covering every route of the service.
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_match_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/pair-game-quiz/pairs/connection",
            "/pair-game-quiz/pairs/my-current/answers",
            "/pair-game-quiz/users/top",
            "/sa/quiz/questions/{id}/publish",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
