/// Database model definitions.
pub mod models;
/// Match and question bank persistence backends.
pub mod quiz_store;
/// Storage abstraction layer for database operations.
pub mod storage;
