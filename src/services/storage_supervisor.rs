use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{quiz_store::QuizStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Doubling delay capped at [`MAX_DELAY`].
#[derive(Debug)]
struct Backoff {
    next: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            next: INITIAL_DELAY,
        }
    }

    fn reset(&mut self) {
        self.next = INITIAL_DELAY;
    }

    /// Delay to wait now; the following one is doubled.
    fn advance(&mut self) -> Duration {
        let current = self.next;
        self.next = (self.next * 2).min(MAX_DELAY);
        current
    }

    async fn wait(&mut self) {
        sleep(self.advance()).await;
    }
}

/// Connect to the storage backend and keep the shared state in degraded mode while it is
/// unavailable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn QuizStore>, StorageError>> + Send,
{
    let mut backoff = Backoff::new();

    loop {
        match connect().await {
            Ok(store) => {
                state.set_quiz_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                backoff.reset();

                watch(&state, store.as_ref()).await;

                state.clear_quiz_store().await;
                warn!("storage lost; reconnecting from scratch");
                backoff.wait().await;
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                backoff.wait().await;
            }
        }
    }
}

/// Poll the store until it stays unreachable after [`MAX_RECONNECT_ATTEMPTS`] reconnects.
async fn watch(state: &SharedState, store: &dyn QuizStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed; entering degraded mode");
                state.update_degraded(true);
                if !reconnect(store).await {
                    warn!("exhausted storage reconnect attempts; staying in degraded mode");
                    return;
                }
                state.update_degraded(false);
                sleep(HEALTH_POLL_INTERVAL).await;
            }
        }
    }
}

async fn reconnect(store: &dyn QuizStore) -> bool {
    let mut backoff = Backoff::new();
    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) => {
                warn!(attempt, error = %err, "storage reconnect attempt failed");
                backoff.wait().await;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use tokio::time::timeout;

    use super::*;
    use crate::{
        config::AppConfig, dao::quiz_store::memory::InMemoryQuizStore, state::AppState,
    };

    #[test]
    fn backoff_doubles_up_to_cap() {
        let mut backoff = Backoff::new();
        let delays: Vec<u64> = (0..6).map(|_| backoff.advance().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 10, 10]);
        backoff.reset();
        assert_eq!(backoff.advance(), INITIAL_DELAY);
    }

    #[tokio::test]
    async fn installed_store_leaves_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.degraded_watcher();

        let task = tokio::spawn(run(state.clone(), || async {
            Ok(Arc::new(InMemoryQuizStore::new()) as Arc<dyn QuizStore>)
        }));

        timeout(Duration::from_secs(1), watcher.wait_for(|degraded| !degraded))
            .await
            .expect("store installed in time")
            .unwrap();
        assert!(state.require_quiz_store().await.is_ok());
        task.abort();
    }
}
