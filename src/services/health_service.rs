use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether storage is usable, pinging it when installed.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.quiz_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    HealthResponse::from_degraded(state.is_degraded())
}
