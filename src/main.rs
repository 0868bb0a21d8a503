//! Quiz duel backend entrypoint wiring the REST layer, storage supervision and the expiry sweeper.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quiz_duel_back::{
    config::AppConfig,
    dao::quiz_store::memory::InMemoryQuizStore,
    routes,
    services::expiry_sweeper,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = match env::var("MONGO_URI").ok().filter(|uri| !uri.is_empty()) {
        Some(uri) => start_mongo(config, uri),
        None => {
            info!("MONGO_URI not set; using the in-memory store");
            AppState::with_store(config, Arc::new(InMemoryQuizStore::new()))
        }
    };

    tokio::spawn(expiry_sweeper::run(app_state.clone()));
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Start in degraded mode and let the supervisor connect MongoDB in the background.
#[cfg(feature = "mongo-store")]
fn start_mongo(config: AppConfig, uri: String) -> SharedState {
    use quiz_duel_back::{
        dao::{
            quiz_store::{
                QuizStore,
                mongodb::{MongoConfig, MongoQuizStore},
            },
            storage::StorageError,
        },
        services::storage_supervisor,
    };

    let db_name = env::var("MONGO_DB").ok();
    let state = AppState::new(config);

    tokio::spawn(storage_supervisor::run(state.clone(), move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let mongo_config = MongoConfig::from_uri(&uri, db_name.as_deref())
                .await
                .map_err(StorageError::from)?;
            let store = MongoQuizStore::connect(mongo_config)
                .await
                .map_err(StorageError::from)?;
            Ok(Arc::new(store) as Arc<dyn QuizStore>)
        }
    }));

    state
}

#[cfg(not(feature = "mongo-store"))]
fn start_mongo(config: AppConfig, _uri: String) -> SharedState {
    tracing::warn!("built without the mongo-store feature; ignoring MONGO_URI");
    AppState::with_store(config, Arc::new(InMemoryQuizStore::new()))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
