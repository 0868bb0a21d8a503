use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for MongoDB operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures raised by the MongoDB backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// Connection string rejected by the driver.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    /// Client could not be built from the options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    /// Fresh connection did not answer the ping.
    #[error("MongoDB database `{database}` did not answer the connection ping")]
    ConnectPing {
        database: String,
        #[source]
        source: MongoError,
    },
    /// Established connection stopped answering.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    /// Index creation failed at startup.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    /// Match insert or replace failed.
    #[error("failed to save match `{id}`")]
    SaveMatch {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    /// Match lookup failed.
    #[error("failed to load match `{id}`")]
    LoadMatch {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    /// Match listing failed.
    #[error("failed to query matches")]
    QueryMatches {
        #[source]
        source: MongoError,
    },
    /// Versioned replace matched no document.
    #[error("match `{id}` changed since version {expected}")]
    VersionConflict { id: Uuid, expected: u64 },
    /// Question write failed.
    #[error("failed to save question `{id}`")]
    SaveQuestion {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    /// Question lookup or draw failed.
    #[error("failed to query questions")]
    QueryQuestions {
        #[source]
        source: MongoError,
    },
    /// Document could not be mapped back onto an entity.
    #[error("stored document `{id}` is malformed: {reason}")]
    MalformedDocument { id: String, reason: &'static str },
}
