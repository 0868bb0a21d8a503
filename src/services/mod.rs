/// Answer submission and scoring.
pub mod answer_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Background finalization of matches whose grace window elapsed.
pub mod expiry_sweeper;
/// Health check service.
pub mod health_service;
/// Read-only match views, statistics and leaderboard.
pub mod match_query_service;
/// Pairing of arriving players.
pub mod matchmaking_service;
/// Versioned match load/save helpers.
pub mod persistence;
/// Question bank administration.
pub mod question_service;
/// Storage connection supervisor driving degraded mode.
pub mod storage_supervisor;
#[cfg(test)]
mod test_support;
