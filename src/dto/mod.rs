use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Pagination and sorting shared by listings.
pub mod common;
/// Health check payloads.
pub mod health;
/// Question bank administration payloads.
pub mod question;
/// Match, answer, statistics and leaderboard payloads.
pub mod quiz_match;
/// Field validators shared by request payloads.
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
