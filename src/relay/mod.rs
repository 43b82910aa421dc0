//! Client relay — captures a selection, calls the proxy, persists the outcome
//!
//! Each cycle moves the stored state `Idle → Analyzing → {Succeeded, Failed}`.
//! Cycles are numbered; a completion is applied only if it belongs to the
//! latest dispatched cycle, so a slow earlier request can never overwrite the
//! result of a newer one.

mod badge;
mod client;
mod state;
mod store;

pub use badge::{Badge, LogObserver, RelayObserver};
pub use client::{FactCheckService, HttpFactCheckClient, ServiceError};
pub use state::{
    connection_failure_result, ExtensionState, Phase, RequestId, CONNECTION_FAILURE_SUMMARY,
};
pub use store::{JsonFileStateStore, MemoryStateStore, StateStore, StorageError, StorageResult};

use crate::analysis::AnalysisResult;
use crate::config::RelayConfig;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no text selected")]
    EmptySelection,

    #[error("state storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Handle for a dispatched cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: RequestId,
    pub text: String,
}

/// What a full cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub request_id: RequestId,
    /// False if a newer cycle superseded this one before it resolved.
    pub applied: bool,
    pub state: ExtensionState,
}

pub struct Relay {
    service: Arc<dyn FactCheckService>,
    store: Arc<dyn StateStore>,
    observer: Arc<dyn RelayObserver>,
    open_on_success: bool,
    // Orders transitions within this process; the store orders them across processes.
    transition: Mutex<()>,
}

impl Relay {
    pub fn new(service: Arc<dyn FactCheckService>, store: Arc<dyn StateStore>) -> Self {
        Self {
            service,
            store,
            observer: Arc::new(LogObserver),
            open_on_success: false,
            transition: Mutex::new(()),
        }
    }

    /// Relay that talks to `config.proxy_endpoint` over HTTP and persists
    /// state to `config.state_path`.
    pub fn over_http(config: &RelayConfig) -> Self {
        Self::new(
            Arc::new(HttpFactCheckClient::new(config.proxy_endpoint.clone())),
            Arc::new(JsonFileStateStore::open(&config.state_path)),
        )
        .open_on_success(config.open_on_success)
    }

    pub fn with_observer(mut self, observer: Arc<dyn RelayObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Ask the observer to open the UI surface after each successful cycle.
    pub fn open_on_success(mut self, open: bool) -> Self {
        self.open_on_success = open;
        self
    }

    /// Current stored state.
    pub fn snapshot(&self) -> StorageResult<ExtensionState> {
        self.store.load()
    }

    /// Run one full cycle for `selection`.
    pub async fn fact_check(&self, selection: &str) -> Result<CycleReport, RelayError> {
        let ticket = self.begin(selection).await?;
        let outcome = self.service.check(&ticket.text).await;
        let applied = self.complete(&ticket, outcome).await?;
        Ok(CycleReport {
            request_id: ticket.id,
            applied,
            state: self.store.load()?,
        })
    }

    /// Enter `Analyzing` for `selection`. Blank selections are ignored.
    pub async fn begin(&self, selection: &str) -> Result<Ticket, RelayError> {
        let text = selection.trim();
        if text.is_empty() {
            return Err(RelayError::EmptySelection);
        }

        let _guard = self.transition.lock().await;
        let mut id = 0;
        self.store.update(&mut |state| {
            id = state.begin(text);
            true
        })?;
        self.observer.set_badge(Badge::InProgress);

        info!(request_id = id, text_chars = text.len(), "analysis started");
        Ok(Ticket {
            id,
            text: text.to_string(),
        })
    }

    /// Resolve the cycle behind `ticket`.
    ///
    /// Returns `false`, leaving state and badge untouched, if a newer cycle
    /// has been dispatched since. If the outcome cannot be stored, the cycle
    /// is marked failed with the storage error where possible so it does not
    /// stay `Analyzing`.
    pub async fn complete(
        &self,
        ticket: &Ticket,
        outcome: Result<AnalysisResult, ServiceError>,
    ) -> Result<bool, RelayError> {
        let _guard = self.transition.lock().await;
        let mut outcome = Some(outcome);
        let mut succeeded = None;
        let mut latest = ticket.id;

        let stored = self.store.update(&mut |state| {
            if state.request_id != ticket.id {
                latest = state.request_id;
                return false;
            }
            match outcome.take() {
                Some(Ok(result)) => {
                    info!(request_id = ticket.id, score = ?result.score, "analysis succeeded");
                    state.succeed(result);
                    succeeded = Some(true);
                }
                Some(Err(e)) => {
                    warn!(request_id = ticket.id, "analysis failed (proxy/network error): {}", e);
                    state.fail(e.to_string());
                    succeeded = Some(false);
                }
                None => return false,
            }
            true
        });

        if let Err(e) = stored {
            self.fail_after_storage_error(ticket, &e);
            return Err(e.into());
        }

        match succeeded {
            None => {
                debug!(request_id = ticket.id, latest, "discarding stale analysis result");
                Ok(false)
            }
            Some(true) => {
                self.observer.set_badge(Badge::Success);
                if self.open_on_success {
                    self.observer.open_surface();
                }
                Ok(true)
            }
            Some(false) => {
                self.observer.set_badge(Badge::Error);
                Ok(true)
            }
        }
    }

    fn fail_after_storage_error(&self, ticket: &Ticket, cause: &StorageError) {
        error!(request_id = ticket.id, "could not store analysis outcome: {}", cause);
        let recovered = self.store.update(&mut |state| {
            if state.request_id != ticket.id || !state.is_analyzing {
                return false;
            }
            state.fail(format!("Could not store the analysis result: {}", cause));
            true
        });
        match recovered {
            Ok(state) if state.request_id == ticket.id && !state.is_analyzing => {
                self.observer.set_badge(Badge::Error);
            }
            Ok(_) => {}
            Err(e) => warn!(request_id = ticket.id, "state left analyzing: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tempfile::tempdir;

    struct CannedService(Result<AnalysisResult, String>);

    #[async_trait]
    impl FactCheckService for CannedService {
        async fn check(&self, _text: &str) -> Result<AnalysisResult, ServiceError> {
            self.0.clone().map_err(ServiceError::Network)
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        badges: StdMutex<Vec<Badge>>,
        opened: StdMutex<usize>,
    }

    impl RelayObserver for RecordingObserver {
        fn set_badge(&self, badge: Badge) {
            self.badges.lock().unwrap().push(badge);
        }

        fn open_surface(&self) {
            *self.opened.lock().unwrap() += 1;
        }
    }

    fn relay(
        outcome: Result<AnalysisResult, String>,
    ) -> (Relay, Arc<MemoryStateStore>, Arc<RecordingObserver>) {
        let store = Arc::new(MemoryStateStore::new());
        let observer = Arc::new(RecordingObserver::default());
        let relay = Relay::new(Arc::new(CannedService(outcome)), store.clone())
            .with_observer(observer.clone());
        (relay, store, observer)
    }

    #[tokio::test]
    async fn begin_marks_analyzing() {
        let (relay, store, observer) = relay(Ok(AnalysisResult::new(50.0, "", vec![])));

        let ticket = relay.begin("  The Earth is flat.  ").await.unwrap();

        let state = store.load().unwrap();
        assert_eq!(ticket.text, "The Earth is flat.");
        assert!(state.is_analyzing);
        assert_eq!(state.analysis_result, None);
        assert_eq!(state.last_selected_text, "The Earth is flat.");
        assert_eq!(*observer.badges.lock().unwrap(), vec![Badge::InProgress]);
    }

    #[tokio::test]
    async fn blank_selection_is_ignored() {
        let (relay, store, observer) = relay(Ok(AnalysisResult::new(50.0, "", vec![])));

        let err = relay.fact_check("   ").await.unwrap_err();

        assert!(matches!(err, RelayError::EmptySelection));
        assert_eq!(store.load().unwrap(), ExtensionState::default());
        assert!(observer.badges.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn success_stores_result_and_opens_surface() {
        let result = AnalysisResult::new(85.0, "Well supported.", vec!["https://a.org".into()]);
        let (relay, _store, observer) = relay(Ok(result.clone()));
        let relay = relay.open_on_success(true);

        let report = relay.fact_check("claim").await.unwrap();

        assert!(report.applied);
        assert_eq!(report.state.phase(), Phase::Succeeded);
        assert_eq!(report.state.analysis_result, Some(result));
        assert_eq!(
            *observer.badges.lock().unwrap(),
            vec![Badge::InProgress, Badge::Success]
        );
        assert_eq!(*observer.opened.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn failure_stores_placeholder() {
        let (relay, _store, observer) = relay(Err("connection refused".into()));

        let report = relay.fact_check("claim").await.unwrap();

        assert_eq!(report.state.phase(), Phase::Failed);
        assert!(!report.state.is_analyzing);
        assert_eq!(report.state.analysis_result, Some(connection_failure_result()));
        assert!(report.state.last_error.unwrap().contains("connection refused"));
        assert_eq!(
            *observer.badges.lock().unwrap(),
            vec![Badge::InProgress, Badge::Error]
        );
        assert_eq!(*observer.opened.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn stale_completion_is_discarded() {
        let (relay, store, observer) = relay(Ok(AnalysisResult::new(50.0, "", vec![])));

        let first = relay.begin("first claim").await.unwrap();
        let second = relay.begin("second claim").await.unwrap();

        let newer = AnalysisResult::new(90.0, "second", vec![]);
        assert!(relay.complete(&second, Ok(newer.clone())).await.unwrap());

        let older = AnalysisResult::new(10.0, "first", vec![]);
        assert!(!relay.complete(&first, Ok(older)).await.unwrap());

        let state = store.load().unwrap();
        assert_eq!(state.analysis_result, Some(newer));
        assert_eq!(state.last_selected_text, "second claim");
        assert_eq!(
            *observer.badges.lock().unwrap(),
            vec![Badge::InProgress, Badge::InProgress, Badge::Success]
        );
    }

    #[tokio::test]
    async fn stale_completion_cannot_end_newer_cycle() {
        let (relay, store, _observer) = relay(Ok(AnalysisResult::new(50.0, "", vec![])));

        let first = relay.begin("first").await.unwrap();
        let _second = relay.begin("second").await.unwrap();

        let applied = relay
            .complete(&first, Err(ServiceError::Network("timeout".into())))
            .await
            .unwrap();

        assert!(!applied);
        assert_eq!(store.load().unwrap().phase(), Phase::Analyzing);
    }

    /// File store whose updates hold the lock for `delay` before applying.
    struct SlowFileStore {
        inner: JsonFileStateStore,
        delay: Duration,
    }

    impl StateStore for SlowFileStore {
        fn load(&self) -> StorageResult<ExtensionState> {
            self.inner.load()
        }

        fn save(&self, state: &ExtensionState) -> StorageResult<()> {
            self.inner.save(state)
        }

        fn update(
            &self,
            apply: &mut dyn FnMut(&mut ExtensionState) -> bool,
        ) -> StorageResult<ExtensionState> {
            self.inner.update(&mut |state| {
                std::thread::sleep(self.delay);
                apply(state)
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn relays_sharing_a_file_let_the_newest_cycle_win() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let slow = Arc::new(
            Relay::new(
                Arc::new(CannedService(Ok(AnalysisResult::new(10.0, "older", vec![])))),
                Arc::new(SlowFileStore {
                    inner: JsonFileStateStore::open(&path),
                    delay: Duration::from_millis(300),
                }),
            ),
        );
        let fast = Relay::new(
            Arc::new(CannedService(Ok(AnalysisResult::new(90.0, "newer", vec![])))),
            Arc::new(JsonFileStateStore::open(&path)),
        );

        let older = slow.begin("older claim").await.unwrap();
        let completing = {
            let slow = slow.clone();
            let older = older.clone();
            tokio::spawn(async move {
                slow.complete(&older, Ok(AnalysisResult::new(10.0, "older", vec![])))
                    .await
                    .unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        let newer = fast.begin("newer claim").await.unwrap();
        let applied_old = completing.await.unwrap();
        let applied_new = fast
            .complete(&newer, Ok(AnalysisResult::new(90.0, "newer", vec![])))
            .await
            .unwrap();

        assert_eq!((older.id, newer.id), (1, 2));
        assert!(applied_old);
        assert!(applied_new);
        let state = JsonFileStateStore::open(&path).load().unwrap();
        assert_eq!(state.request_id, 2);
        assert_eq!(state.last_selected_text, "newer claim");
        assert_eq!(state.analysis_result.unwrap().summary, "newer");
    }

    /// Memory store that fails its next save once armed.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStateStore,
        fail_next_save: AtomicBool,
    }

    impl StateStore for FlakyStore {
        fn load(&self) -> StorageResult<ExtensionState> {
            self.inner.load()
        }

        fn save(&self, state: &ExtensionState) -> StorageResult<()> {
            if self.fail_next_save.swap(false, Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.save(state)
        }
    }

    #[tokio::test]
    async fn storage_failure_on_completion_does_not_leave_cycle_analyzing() {
        let store = Arc::new(FlakyStore::default());
        let observer = Arc::new(RecordingObserver::default());
        let relay = Relay::new(
            Arc::new(CannedService(Ok(AnalysisResult::new(80.0, "fine", vec![])))),
            store.clone(),
        )
        .with_observer(observer.clone());

        let ticket = relay.begin("claim").await.unwrap();
        store.fail_next_save.store(true, Ordering::SeqCst);
        let err = relay
            .complete(&ticket, Ok(AnalysisResult::new(80.0, "fine", vec![])))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Storage(_)));
        let state = store.load().unwrap();
        assert!(!state.is_analyzing);
        assert_eq!(state.phase(), Phase::Failed);
        assert!(state.last_error.unwrap().contains("disk full"));
        assert_eq!(
            *observer.badges.lock().unwrap(),
            vec![Badge::InProgress, Badge::Error]
        );
    }
}
