//! Shared test utilities for integration tests
//!
//! Environment isolation for configuration tests, plus search-source test
//! doubles: a recording wrapper, an always-failing backend, a backend that
//! can be switched into failing, and a gated backend that holds one anchor
//! lookup until released.

use anchorview::error::SearchError;
use anchorview::search::memory::{MemoryDocument, MemorySource};
use anchorview::search::{SearchRequest, SearchResponse, SearchSource};
use async_trait::async_trait;
use futures::channel::oneshot;
use parking_lot::Mutex as PlMutex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const TOUCHED_VARS: &[&str] = &[
    "HOME",
    "XDG_CONFIG_HOME",
    "ANCHORVIEW_ENV",
    "ANCHORVIEW__SEARCH__INDEX",
    "ANCHORVIEW__CONTEXT__DEFAULT_SIZE",
    "ANCHORVIEW__CONTEXT__TIE_BREAKER_FIELDS",
];

/// Environment variable state to restore after test
struct EnvState(Vec<(&'static str, Option<String>)>);

impl EnvState {
    fn capture() -> Self {
        Self(
            TOUCHED_VARS
                .iter()
                .map(|name| (*name, std::env::var(name).ok()))
                .collect(),
        )
    }

    fn restore(self) {
        for (name, value) in self.0 {
            match value {
                Some(orig) => std::env::set_var(name, orig),
                None => std::env::remove_var(name),
            }
        }
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into `test_dir` and every
/// ANCHORVIEW variable cleared; the environment is restored afterwards.
///
/// Global config lives at `<test_dir>/anchorview/config.toml`.
pub fn with_config_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_home).unwrap();

    for name in TOUCHED_VARS {
        std::env::remove_var(name);
    }
    std::env::set_var("HOME", test_home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path().to_str().unwrap());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
    env_state.restore();
    match result {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Wraps a source and keeps every request it forwards
pub struct RecordingSource<S> {
    inner: S,
    requests: PlMutex<Vec<SearchRequest>>,
}

impl<S: SearchSource> RecordingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            requests: PlMutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl<S: SearchSource> SearchSource for RecordingSource<S> {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        self.requests.lock().push(request.clone());
        self.inner.search(request).await
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Backend that is always unreachable
pub struct FailingSource;

#[async_trait]
impl SearchSource for FailingSource {
    async fn search(&self, _request: SearchRequest) -> Result<SearchResponse, SearchError> {
        Err(SearchError::RequestFailed("Connection error: refused".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Forwards to an in-memory backend until switched into failing mode
pub struct SwitchableSource {
    inner: MemorySource,
    failing: AtomicBool,
}

impl SwitchableSource {
    pub fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SearchSource for SwitchableSource {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SearchError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.inner.search(request).await
    }

    fn name(&self) -> &str {
        "switchable"
    }
}

/// Holds the lookup of one anchor id until `release` is called
pub struct GatedSource {
    inner: MemorySource,
    gated_id: String,
    gate: PlMutex<Option<oneshot::Receiver<()>>>,
}

impl GatedSource {
    pub fn new(inner: MemorySource, gated_id: &str) -> (Self, oneshot::Sender<()>) {
        let (release, gate) = oneshot::channel();
        (
            Self {
                inner,
                gated_id: gated_id.to_string(),
                gate: PlMutex::new(Some(gate)),
            },
            release,
        )
    }
}

#[async_trait]
impl SearchSource for GatedSource {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        let gated = request
            .ids
            .as_ref()
            .map_or(false, |ids| ids.contains(&self.gated_id));
        if gated {
            let gate = self.gate.lock().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
        }
        self.inner.search(request).await
    }

    fn name(&self) -> &str {
        "gated"
    }
}

/// `count` records one millisecond apart starting at `start`, with a
/// sortable `seq` field.
pub fn evenly_spaced(index: &str, start: i64, count: usize) -> MemorySource {
    let docs = (0..count)
        .map(|i| {
            MemoryDocument::new(
                format!("doc-{:04}", i),
                json!({"@timestamp": start + i as i64, "seq": i as u64, "host": format!("web-{}", i % 3)}),
            )
        })
        .collect();
    MemorySource::from_docs(index, docs)
}
