//! Shared third-party libraries, fetched on demand and cached by name.
//!
//! Only names from the configured table can be loaded. Fetched source is
//! checked against its pinned SHA-256 (when one is configured) and then handed
//! to a [`LibraryEvaluator`], the single place where foreign code crosses into
//! the framework. Concurrent loads of the same name share one in-flight fetch.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::config::DependencySpec;
use crate::error::DependencyError;
use crate::host::HostFetch;

/// An evaluated library. Cheap to clone; clones share the same instance.
#[derive(Clone)]
pub struct LibraryHandle(Arc<Library>);

pub struct Library {
    pub name: String,
    /// Global the library exports.
    pub export: String,
    pub source: String,
    /// SHA-256 of `source`, lowercase hex.
    pub sha256: String,
}

impl LibraryHandle {
    pub fn new(library: Library) -> Self {
        Self(Arc::new(library))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn export(&self) -> &str {
        &self.0.export
    }

    pub fn source(&self) -> &str {
        &self.0.source
    }

    pub fn sha256(&self) -> &str {
        &self.0.sha256
    }

    /// True when both handles refer to the same loaded instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for LibraryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryHandle")
            .field("name", &self.0.name)
            .field("export", &self.0.export)
            .field("sha256", &self.0.sha256)
            .finish()
    }
}

/// Turns verified source text into a library handle.
pub trait LibraryEvaluator: Send + Sync {
    fn evaluate(
        &self,
        name: &str,
        spec: &DependencySpec,
        source: String,
    ) -> Result<LibraryHandle, String>;
}

/// Default evaluator: keeps the source as an opaque module and requires it to
/// define the declared export. Nothing is executed in the framework's scope.
pub struct IsolatedModule;

impl LibraryEvaluator for IsolatedModule {
    fn evaluate(
        &self,
        name: &str,
        spec: &DependencySpec,
        source: String,
    ) -> Result<LibraryHandle, String> {
        if source.trim().is_empty() {
            return Err("empty source".into());
        }
        let pattern = format!(r"\b{}\b", regex::escape(&spec.export));
        let defines_export = regex::Regex::new(&pattern)
            .map_err(|e| format!("invalid export name \"{}\": {e}", spec.export))?
            .is_match(&source);
        if !defines_export {
            return Err(format!("{} is not defined", spec.export));
        }
        let sha256 = sha256_hex(&source);
        Ok(LibraryHandle::new(Library {
            name: name.to_string(),
            export: spec.export.clone(),
            source,
            sha256,
        }))
    }
}

pub(crate) fn sha256_hex(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

type PendingLoad = Shared<BoxFuture<'static, Result<LibraryHandle, DependencyError>>>;

pub struct DependencyLoader {
    table: BTreeMap<String, DependencySpec>,
    fetch: Arc<dyn HostFetch>,
    evaluator: Arc<dyn LibraryEvaluator>,
    cache: DashMap<String, LibraryHandle>,
    in_flight: Mutex<HashMap<String, PendingLoad>>,
}

impl DependencyLoader {
    pub fn new(table: BTreeMap<String, DependencySpec>, fetch: Arc<dyn HostFetch>) -> Self {
        Self::with_evaluator(table, fetch, Arc::new(IsolatedModule))
    }

    pub fn with_evaluator(
        table: BTreeMap<String, DependencySpec>,
        fetch: Arc<dyn HostFetch>,
        evaluator: Arc<dyn LibraryEvaluator>,
    ) -> Self {
        Self {
            table,
            fetch,
            evaluator,
            cache: DashMap::new(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Load `name`, from cache when possible. Unknown names fail without any
    /// network access; failures are not cached.
    pub async fn load(&self, name: &str) -> Result<LibraryHandle, DependencyError> {
        if let Some(handle) = self.cache.get(name) {
            return Ok(handle.value().clone());
        }

        let Some(spec) = self.table.get(name).cloned() else {
            return Err(DependencyError::Unknown(name.to_string()));
        };

        let pending = {
            let mut in_flight = self.in_flight.lock();
            in_flight
                .entry(name.to_string())
                .or_insert_with(|| {
                    fetch_and_evaluate(
                        name.to_string(),
                        spec,
                        self.fetch.clone(),
                        self.evaluator.clone(),
                    )
                    .boxed()
                    .shared()
                })
                .clone()
        };

        let result = pending.clone().await;

        // Cache before retiring the in-flight entry so no caller slips between.
        if let Ok(handle) = &result {
            self.cache
                .entry(name.to_string())
                .or_insert_with(|| handle.clone());
        }
        {
            let mut in_flight = self.in_flight.lock();
            if in_flight.get(name).is_some_and(|p| p.ptr_eq(&pending)) {
                in_flight.remove(name);
            }
        }
        result
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Drop every cached handle. In-flight loads are not cancelled.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn known(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

async fn fetch_and_evaluate(
    name: String,
    spec: DependencySpec,
    fetch: Arc<dyn HostFetch>,
    evaluator: Arc<dyn LibraryEvaluator>,
) -> Result<LibraryHandle, DependencyError> {
    tracing::info!("[deps] Loading {name} from {}", spec.url);

    let source = fetch
        .fetch_text(&spec.url)
        .await
        .map_err(|reason| DependencyError::Network {
            name: name.clone(),
            reason,
        })?;

    match &spec.sha256 {
        Some(expected) => {
            let actual = sha256_hex(&source);
            if !expected.eq_ignore_ascii_case(&actual) {
                return Err(DependencyError::ChecksumMismatch {
                    name,
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        None => tracing::warn!("[deps] {name} has no pinned checksum"),
    }

    let handle = evaluator
        .evaluate(&name, &spec, source)
        .map_err(|reason| DependencyError::Evaluation {
            name: name.clone(),
            reason,
        })?;

    tracing::info!("[deps] Loaded {name}");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TURNDOWN_SRC: &str = "var TurndownService = (function () { return function () {}; })();";

    struct CountingFetch {
        calls: AtomicUsize,
        body: Result<String, String>,
    }

    impl CountingFetch {
        fn ok(body: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                body: Ok(body.to_string()),
            })
        }

        fn failing(reason: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                body: Err(reason.to_string()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HostFetch for CountingFetch {
        async fn fetch_text(&self, _url: &str) -> Result<String, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.body.clone()
        }
    }

    fn table() -> BTreeMap<String, DependencySpec> {
        BTreeMap::from([(
            "turndown".to_string(),
            DependencySpec::new("https://cdn.test/turndown.js", "TurndownService"),
        )])
    }

    #[tokio::test]
    async fn unknown_dependency_fails_without_fetching() {
        let fetch = CountingFetch::ok(TURNDOWN_SRC);
        let loader = DependencyLoader::new(table(), fetch.clone());

        let err = loader.load("unknown-lib").await.unwrap_err();
        assert_eq!(err, DependencyError::Unknown("unknown-lib".into()));
        assert_eq!(err.to_string(), "Unknown dependency: unknown-lib");
        assert_eq!(fetch.calls(), 0);
    }

    #[tokio::test]
    async fn second_load_is_served_from_cache() {
        let fetch = CountingFetch::ok(TURNDOWN_SRC);
        let loader = DependencyLoader::new(table(), fetch.clone());

        let first = loader.load("turndown").await.unwrap();
        let second = loader.load("turndown").await.unwrap();

        assert!(first.same_instance(&second));
        assert_eq!(first.export(), "TurndownService");
        assert_eq!(fetch.calls(), 1);
        assert!(loader.is_loaded("turndown"));
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_fetch() {
        let fetch = CountingFetch::ok(TURNDOWN_SRC);
        let loader = DependencyLoader::new(table(), fetch.clone());

        let (a, b, c) = tokio::join!(
            loader.load("turndown"),
            loader.load("turndown"),
            loader.load("turndown")
        );

        let a = a.unwrap();
        assert!(a.same_instance(&b.unwrap()));
        assert!(a.same_instance(&c.unwrap()));
        assert_eq!(fetch.calls(), 1);
    }

    #[tokio::test]
    async fn network_failure_is_not_cached() {
        let fetch = CountingFetch::failing("connection reset");
        let loader = DependencyLoader::new(table(), fetch.clone());

        let err = loader.load("turndown").await.unwrap_err();
        assert!(matches!(err, DependencyError::Network { .. }));
        assert!(err.to_string().contains("connection reset"));
        assert!(!loader.is_loaded("turndown"));

        let _ = loader.load("turndown").await;
        assert_eq!(fetch.calls(), 2);
    }

    #[tokio::test]
    async fn missing_export_is_an_evaluation_error() {
        let fetch = CountingFetch::ok("var SomethingElse = 1;");
        let loader = DependencyLoader::new(table(), fetch);

        let err = loader.load("turndown").await.unwrap_err();
        assert_eq!(
            err,
            DependencyError::Evaluation {
                name: "turndown".into(),
                reason: "TurndownService is not defined".into(),
            }
        );
        assert!(!loader.is_loaded("turndown"));
    }

    #[tokio::test]
    async fn pinned_checksum_is_enforced() {
        let mut pinned = table();
        pinned.get_mut("turndown").unwrap().sha256 = Some("00".repeat(32));
        let loader = DependencyLoader::new(pinned, CountingFetch::ok(TURNDOWN_SRC));

        let err = loader.load("turndown").await.unwrap_err();
        assert!(matches!(err, DependencyError::ChecksumMismatch { .. }));
    }

    #[tokio::test]
    async fn matching_checksum_loads() {
        let mut pinned = table();
        pinned.get_mut("turndown").unwrap().sha256 = Some(sha256_hex(TURNDOWN_SRC).to_uppercase());
        let loader = DependencyLoader::new(pinned, CountingFetch::ok(TURNDOWN_SRC));

        let handle = loader.load("turndown").await.unwrap();
        assert_eq!(handle.sha256(), sha256_hex(TURNDOWN_SRC));
        assert_eq!(handle.source(), TURNDOWN_SRC);
    }

    #[tokio::test]
    async fn clear_cache_forces_refetch() {
        let fetch = CountingFetch::ok(TURNDOWN_SRC);
        let loader = DependencyLoader::new(table(), fetch.clone());

        let first = loader.load("turndown").await.unwrap();
        loader.clear_cache();
        assert!(!loader.is_loaded("turndown"));

        let second = loader.load("turndown").await.unwrap();
        assert!(!first.same_instance(&second));
        assert_eq!(fetch.calls(), 2);
    }

    #[test]
    fn sha256_hex_is_lowercase_hex() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn evaluator_rejects_empty_source() {
        let spec = DependencySpec::new("https://cdn.test/x.js", "X");
        assert!(IsolatedModule.evaluate("x", &spec, "   ".into()).is_err());
    }

    #[test]
    fn evaluator_requires_whole_word_export() {
        let spec = DependencySpec::new("https://cdn.test/r.js", "Readability");
        assert!(IsolatedModule.evaluate("r", &spec, "var ReadabilityX = 1;".into()).is_err());
        assert!(IsolatedModule.evaluate("r", &spec, "function Readability() {}".into()).is_ok());
    }
}
