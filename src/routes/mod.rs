use axum::Router;

use crate::state::SharedState;

/// Swagger UI and OpenAPI document.
pub mod docs;
/// Health check route.
pub mod health;
/// Caller identity extractor.
pub mod identity;
/// Question bank administration routes.
pub mod questions;
/// Player-facing match routes.
pub mod quiz;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(quiz::router())
        .merge(questions::router(state.clone()))
        .merge(docs::router());

    api_router.with_state(state)
}
