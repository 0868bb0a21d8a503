//! Library crate for quiz-duel-back, exposing modules for binaries and integration tests.

/// Runtime configuration.
pub mod config;
/// Persistence entities and backends.
pub mod dao;
/// Wire payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Business operations.
pub mod services;
/// Shared state and match domain model.
pub mod state;
