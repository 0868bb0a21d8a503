/// Per-match lock registry.
pub mod locks;
/// Match aggregate and scoring rules.
pub mod quiz_match;
/// Match status transitions.
pub mod state_machine;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};

use crate::{config::AppConfig, dao::quiz_store::QuizStore, error::ServiceError};

use self::locks::MatchLocks;

/// Handle to the application state shared by handlers and background tasks.
pub type SharedState = Arc<AppState>;

/// Central application state holding the storage handle and the match coordination primitives.
pub struct AppState {
    quiz_store: RwLock<Option<Arc<dyn QuizStore>>>,
    degraded: watch::Sender<bool>,
    match_locks: MatchLocks,
    matchmaking_gate: Mutex<()>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            quiz_store: RwLock::new(None),
            degraded: degraded_tx,
            match_locks: MatchLocks::new(),
            matchmaking_gate: Mutex::new(()),
            config,
        })
    }

    /// Construct a healthy state around an already available store.
    pub fn with_store(config: AppConfig, store: Arc<dyn QuizStore>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(false);
        Arc::new(Self {
            quiz_store: RwLock::new(Some(store)),
            degraded: degraded_tx,
            match_locks: MatchLocks::new(),
            matchmaking_gate: Mutex::new(()),
            config,
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn quiz_store(&self) -> Option<Arc<dyn QuizStore>> {
        let guard = self.quiz_store.read().await;
        guard.as_ref().cloned()
    }

    /// Store handle for service calls; fails with [`ServiceError::Degraded`] while degraded.
    pub async fn require_quiz_store(&self) -> Result<Arc<dyn QuizStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.quiz_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn set_quiz_store(&self, store: Arc<dyn QuizStore>) {
        {
            let mut guard = self.quiz_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_quiz_store(&self) {
        {
            let mut guard = self.quiz_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, notifying watchers only when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Per-match locks shared by matchmaking, submissions and the sweeper.
    pub fn match_locks(&self) -> &MatchLocks {
        &self.match_locks
    }

    /// Process-wide gate serializing create-or-join calls.
    pub fn matchmaking_gate(&self) -> &Mutex<()> {
        &self.matchmaking_gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::quiz_store::memory::InMemoryQuizStore;

    #[tokio::test]
    async fn starts_degraded_until_store_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_quiz_store().await,
            Err(ServiceError::Degraded)
        ));

        let mut watcher = state.degraded_watcher();
        state
            .set_quiz_store(Arc::new(InMemoryQuizStore::new()))
            .await;
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        assert!(state.require_quiz_store().await.is_ok());

        state.clear_quiz_store().await;
        assert!(state.is_degraded());
        assert!(state.quiz_store().await.is_none());
    }

    #[tokio::test]
    async fn degraded_flag_blocks_installed_store() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(InMemoryQuizStore::new()));
        state.update_degraded(true);
        assert!(matches!(
            state.require_quiz_store().await,
            Err(ServiceError::Degraded)
        ));
    }
}
