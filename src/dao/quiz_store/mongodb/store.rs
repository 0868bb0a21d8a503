use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{DateTime, Document, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
    models::{MongoIdDocument, MongoMatchDocument, MongoQuestionDocument, doc_id},
};
use crate::dao::{
    models::{MatchEntity, MatchStatus, QuestionEntity},
    quiz_store::QuizStore,
    storage::StorageResult,
};

const MATCH_COLLECTION_NAME: &str = "matches";
const QUESTION_COLLECTION_NAME: &str = "questions";

/// MongoDB-backed [`QuizStore`]. Cloning shares the connection.
#[derive(Clone)]
pub struct MongoQuizStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

/// Build a client for `config` and check the database answers a ping.
///
/// A single attempt only; retries belong to the storage supervisor.
async fn open_database(config: &MongoConfig) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);
    database
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|source| MongoDaoError::ConnectPing {
            database: config.database_name.clone(),
            source,
        })?;
    Ok((client, database))
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = open_database(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoQuizStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = open_database(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let matches = self.matches().await;
        let match_indexes = [
            ("status", doc! {"status": 1, "created_at": 1}, "match_status_idx"),
            ("players.player_id", doc! {"players.player_id": 1}, "match_player_idx"),
            ("grace_deadline", doc! {"status": 1, "grace_deadline": 1}, "match_grace_idx"),
        ];
        for (index, keys, name) in match_indexes {
            let model = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(Some(name.to_owned())).build())
                .build();
            matches
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: MATCH_COLLECTION_NAME,
                    index,
                    source,
                })?;
        }

        let questions = self.questions().await;
        let model = IndexModel::builder()
            .keys(doc! {"published": 1, "deleted_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("question_drawable_idx".to_owned()))
                    .build(),
            )
            .build();
        questions
            .create_index(model)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: QUESTION_COLLECTION_NAME,
                index: "published,deleted_at",
                source,
            })?;

        Ok(())
    }

    async fn matches(&self) -> Collection<MongoMatchDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoMatchDocument>(MATCH_COLLECTION_NAME)
    }

    async fn questions(&self) -> Collection<MongoQuestionDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoQuestionDocument>(QUESTION_COLLECTION_NAME)
    }

    async fn insert_match(&self, entity: MatchEntity) -> MongoResult<()> {
        let id = entity.id;
        let document: MongoMatchDocument = entity.into();
        self.matches()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveMatch { id, source })?;
        Ok(())
    }

    async fn find_match(&self, id: Uuid) -> MongoResult<Option<MatchEntity>> {
        let document = self
            .matches()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadMatch { id, source })?;

        document.map(MatchEntity::try_from).transpose()
    }

    async fn update_match(&self, entity: MatchEntity, expected_version: u64) -> MongoResult<()> {
        let id = entity.id;
        let mut document: MongoMatchDocument = entity.into();
        document.version = expected_version as i64 + 1;

        let mut filter = doc_id(id);
        filter.insert("version", expected_version as i64);

        let result = self
            .matches()
            .await
            .replace_one(filter, &document)
            .await
            .map_err(|source| MongoDaoError::SaveMatch { id, source })?;

        if result.matched_count == 0 {
            return Err(MongoDaoError::VersionConflict {
                id,
                expected: expected_version,
            });
        }
        Ok(())
    }

    async fn find_matches(
        &self,
        filter: Document,
        sort: Document,
    ) -> MongoResult<Vec<MatchEntity>> {
        let documents: Vec<MongoMatchDocument> = self
            .matches()
            .await
            .find(filter)
            .sort(sort)
            .await
            .map_err(|source| MongoDaoError::QueryMatches { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::QueryMatches { source })?;

        documents.into_iter().map(MatchEntity::try_from).collect()
    }

    async fn find_open_match_for_player(&self, player_id: String) -> MongoResult<Option<MatchEntity>> {
        let filter = doc! {
            "status": { "$in": [MatchStatus::Pending.as_str(), MatchStatus::Active.as_str()] },
            "players.player_id": player_id,
        };
        let document = self
            .matches()
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::QueryMatches { source })?;

        document.map(MatchEntity::try_from).transpose()
    }

    async fn find_pending_match(&self, excluding_player: String) -> MongoResult<Option<MatchEntity>> {
        let filter = doc! {
            "status": MatchStatus::Pending.as_str(),
            "players.player_id": { "$ne": excluding_player },
        };
        let document = self
            .matches()
            .await
            .find_one(filter)
            .sort(doc! {"created_at": 1})
            .await
            .map_err(|source| MongoDaoError::QueryMatches { source })?;

        document.map(MatchEntity::try_from).transpose()
    }

    async fn list_expired_match_ids(&self, now: SystemTime) -> MongoResult<Vec<Uuid>> {
        let filter = doc! {
            "status": MatchStatus::Active.as_str(),
            "grace_deadline": { "$ne": null, "$lte": DateTime::from_system_time(now) },
        };
        let ids: Vec<MongoIdDocument> = self
            .matches()
            .await
            .clone_with_type::<MongoIdDocument>()
            .find(filter)
            .projection(doc! {"_id": 1})
            .sort(doc! {"grace_deadline": 1})
            .await
            .map_err(|source| MongoDaoError::QueryMatches { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::QueryMatches { source })?;

        ids.into_iter().map(MongoIdDocument::into_id).collect()
    }

    async fn save_question(&self, question: QuestionEntity, upsert: bool) -> MongoResult<()> {
        let id = question.id;
        let document: MongoQuestionDocument = question.into();
        let collection = self.questions().await;
        if upsert {
            collection
                .replace_one(doc_id(id), &document)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::SaveQuestion { id, source })?;
        } else {
            collection
                .insert_one(&document)
                .await
                .map_err(|source| MongoDaoError::SaveQuestion { id, source })?;
        }
        Ok(())
    }

    async fn find_questions(&self, filter: Document) -> MongoResult<Vec<QuestionEntity>> {
        let documents: Vec<MongoQuestionDocument> = self
            .questions()
            .await
            .find(filter)
            .await
            .map_err(|source| MongoDaoError::QueryQuestions { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::QueryQuestions { source })?;

        documents.into_iter().map(QuestionEntity::try_from).collect()
    }

    async fn pick_random_published_questions(&self, count: usize) -> MongoResult<Vec<QuestionEntity>> {
        let pipeline = vec![
            doc! { "$match": { "published": true, "deleted_at": null } },
            doc! { "$sample": { "size": count as i64 } },
        ];
        let documents: Vec<MongoQuestionDocument> = self
            .questions()
            .await
            .aggregate(pipeline)
            .with_type::<MongoQuestionDocument>()
            .await
            .map_err(|source| MongoDaoError::QueryQuestions { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::QueryQuestions { source })?;

        documents.into_iter().map(QuestionEntity::try_from).collect()
    }
}

impl QuizStore for MongoQuizStore {
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_match(entity).await.map_err(Into::into) })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_match(id).await.map_err(Into::into) })
    }

    fn update_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_match(entity, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn find_open_match_for_player(
        &self,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_open_match_for_player(player_id)
                .await
                .map_err(Into::into)
        })
    }

    fn find_pending_match(
        &self,
        excluding_player: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_pending_match(excluding_player)
                .await
                .map_err(Into::into)
        })
    }

    fn list_expired_match_ids(
        &self,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Vec<Uuid>>> {
        let store = self.clone();
        Box::pin(async move { store.list_expired_match_ids(now).await.map_err(Into::into) })
    }

    fn list_matches_for_player(
        &self,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_matches(doc! {"players.player_id": player_id}, doc! {"created_at": -1})
                .await
                .map_err(Into::into)
        })
    }

    fn list_finished_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_matches(
                    doc! {"status": MatchStatus::Finished.as_str()},
                    doc! {"finished_at": 1},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_question(question, false).await.map_err(Into::into) })
    }

    fn update_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_question(question, true).await.map_err(Into::into) })
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut filter = doc_id(id);
            filter.insert("deleted_at", mongodb::bson::Bson::Null);
            let found = store.find_questions(filter).await?;
            Ok(found.into_iter().next())
        })
    }

    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_questions(doc! {"deleted_at": null})
                .await
                .map_err(Into::into)
        })
    }

    fn pick_random_published_questions(
        &self,
        count: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .pick_random_published_questions(count)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
