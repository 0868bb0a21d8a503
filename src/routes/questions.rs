use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        common::Paginated,
        question::{PublishQuestionRequest, QuestionInput, QuestionListQuery, QuestionView},
    },
    error::AppError,
    services::question_service,
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Question bank management, guarded by the admin token.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route(
            "/sa/quiz/questions",
            get(list_questions).post(create_question),
        )
        .route(
            "/sa/quiz/questions/{id}",
            put(update_question).delete(delete_question),
        )
        .route("/sa/quiz/questions/{id}/publish", put(publish_question))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// List questions with filters and pagination.
#[utoipa::path(
    get,
    path = "/sa/quiz/questions",
    tag = "questions",
    params(
        ("X-Admin-Token" = String, Header, description = "Configured admin token"),
        QuestionListQuery
    ),
    responses((status = 200, description = "Questions", body = Paginated<QuestionView>))
)]
pub async fn list_questions(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<QuestionListQuery>>,
) -> Result<Json<Paginated<QuestionView>>, AppError> {
    Ok(Json(question_service::list_questions(&state, query).await?))
}

/// Add an unpublished question.
#[utoipa::path(
    post,
    path = "/sa/quiz/questions",
    tag = "questions",
    params(("X-Admin-Token" = String, Header, description = "Configured admin token")),
    request_body = QuestionInput,
    responses((status = 201, description = "Question created", body = QuestionView))
)]
pub async fn create_question(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<QuestionInput>>,
) -> Result<(StatusCode, Json<QuestionView>), AppError> {
    let view = question_service::create_question(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Replace body and accepted answers of a question.
#[utoipa::path(
    put,
    path = "/sa/quiz/questions/{id}",
    tag = "questions",
    params(
        ("X-Admin-Token" = String, Header, description = "Configured admin token"),
        ("id" = Uuid, Path, description = "Question identifier")
    ),
    request_body = QuestionInput,
    responses(
        (status = 200, description = "Question updated", body = QuestionView),
        (status = 404, description = "Unknown or deleted question")
    )
)]
pub async fn update_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<QuestionInput>>,
) -> Result<Json<QuestionView>, AppError> {
    Ok(Json(
        question_service::update_question(&state, id, payload).await?,
    ))
}

/// Publish or unpublish a question.
#[utoipa::path(
    put,
    path = "/sa/quiz/questions/{id}/publish",
    tag = "questions",
    params(
        ("X-Admin-Token" = String, Header, description = "Configured admin token"),
        ("id" = Uuid, Path, description = "Question identifier")
    ),
    request_body = PublishQuestionRequest,
    responses((status = 200, description = "Publication changed", body = QuestionView))
)]
pub async fn publish_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PublishQuestionRequest>,
) -> Result<Json<QuestionView>, AppError> {
    Ok(Json(
        question_service::set_published(&state, id, payload.published).await?,
    ))
}

/// Soft delete a question.
#[utoipa::path(
    delete,
    path = "/sa/quiz/questions/{id}",
    tag = "questions",
    params(
        ("X-Admin-Token" = String, Header, description = "Configured admin token"),
        ("id" = Uuid, Path, description = "Question identifier")
    ),
    responses((status = 204, description = "Question deleted"))
)]
pub async fn delete_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    question_service::delete_question(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config().admin_token() else {
        return Err(AppError::Unauthorized(
            "question administration is disabled".into(),
        ));
    };

    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    if provided != expected {
        return Err(AppError::Unauthorized("invalid admin token".into()));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;

    use super::*;
    use crate::{config::AppConfig, dao::quiz_store::memory::InMemoryQuizStore, routes, state::AppState};

    const LIST_PATH: &str = "/sa/quiz/questions";

    fn server(config: AppConfig) -> TestServer {
        let state = AppState::with_store(config, Arc::new(InMemoryQuizStore::new()));
        TestServer::new(routes::router(state)).unwrap()
    }

    fn token(value: &'static str) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static(ADMIN_TOKEN_HEADER),
            HeaderValue::from_static(value),
        )
    }

    #[tokio::test]
    async fn admin_routes_are_closed_without_configured_token() {
        let server = server(AppConfig::default());
        let (name, value) = token("anything");
        let response = server.get(LIST_PATH).add_header(name, value).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_token_header_is_unauthorized() {
        let server = server(AppConfig::default().with_admin_token("s3cret"));
        let response = server.get(LIST_PATH).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_token_is_unauthorized_and_writes_nothing() {
        let server = server(AppConfig::default().with_admin_token("s3cret"));
        let (name, value) = token("guess");
        let response = server
            .post(LIST_PATH)
            .add_header(name, value)
            .json(&serde_json::json!({
                "body": "Capital city of Peru?",
                "correctAnswers": ["Lima"],
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let (name, value) = token("s3cret");
        let listing = server.get(LIST_PATH).add_header(name, value).await;
        assert_eq!(listing.status_code(), StatusCode::OK);
        assert_eq!(listing.json::<serde_json::Value>()["totalCount"], 0);
    }

    #[tokio::test]
    async fn correct_token_reaches_handlers() {
        let server = server(AppConfig::default().with_admin_token("s3cret"));
        let (name, value) = token("s3cret");
        let created = server
            .post(LIST_PATH)
            .add_header(name.clone(), value.clone())
            .json(&serde_json::json!({
                "body": "Capital city of Peru?",
                "correctAnswers": ["Lima"],
            }))
            .await;
        assert_eq!(created.status_code(), StatusCode::CREATED);

        let listing = server.get(LIST_PATH).add_header(name, value).await;
        assert_eq!(listing.status_code(), StatusCode::OK);
        assert_eq!(listing.json::<serde_json::Value>()["totalCount"], 1);
    }
}
