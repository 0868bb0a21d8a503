mod config;
mod error;
mod models;
/// [`QuizStore`](crate::dao::quiz_store::QuizStore) implementation.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoQuizStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::VersionConflict { id, expected } => StorageError::conflict(id, expected),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
