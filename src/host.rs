//! Host seams: the page environment the framework runs inside.
//!
//! The framework never touches persistence, the network or the document
//! directly. Everything goes through the traits below, bundled into a
//! [`Host`]:
//! - [`HostStore`]: raw key/value persistence (`getValue`/`setValue`/...)
//! - [`HostFetch`]: "fetch text from URL"
//! - [`StyleHost`]: optional `addStyle(cssText)`
//!
//! Ready-made implementations: [`MemoryStore`], [`JsonFileStore`] and
//! [`HttpFetcher`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::config::FrameworkConfig;
use crate::error::{Error, Result};

/// Raw persistent key/value API provided by the host. Treated as synchronous
/// and reliable: the framework neither retries nor buffers.
pub trait HostStore: Send + Sync {
    fn get_value(&self, key: &str, default: Value) -> Value;
    fn set_value(&self, key: &str, value: Value);
    fn delete_value(&self, key: &str);
    fn list_values(&self) -> Vec<String>;
}

/// Network primitive: GET a URL and return the body as text.
#[async_trait]
pub trait HostFetch: Send + Sync {
    async fn fetch_text(&self, url: &str) -> std::result::Result<String, String>;
}

/// Host-provided stylesheet injection (`GM_addStyle`).
pub trait StyleHost: Send + Sync {
    fn add_style(&self, css: &str);
}

/// Everything the framework needs from its environment.
#[derive(Clone)]
pub struct Host {
    pub store: Arc<dyn HostStore>,
    pub fetch: Arc<dyn HostFetch>,
    pub style: Option<Arc<dyn StyleHost>>,
}

impl Host {
    pub fn new(store: Arc<dyn HostStore>, fetch: Arc<dyn HostFetch>) -> Self {
        Self {
            store,
            fetch,
            style: None,
        }
    }

    pub fn with_style(mut self, style: Arc<dyn StyleHost>) -> Self {
        self.style = Some(style);
        self
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. Useful for embedding and tests.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostStore for MemoryStore {
    fn get_value(&self, key: &str, default: Value) -> Value {
        self.values.lock().get(key).cloned().unwrap_or(default)
    }

    fn set_value(&self, key: &str, value: Value) {
        self.values.lock().insert(key.to_string(), value);
    }

    fn delete_value(&self, key: &str) {
        self.values.lock().remove(key);
    }

    fn list_values(&self) -> Vec<String> {
        self.values.lock().keys().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Store persisted as one JSON object on disk. Every mutation rewrites the
/// file atomically (temp file + rename).
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                match serde_json::from_str::<Value>(&content)? {
                    Value::Object(map) => map.into_iter().collect(),
                    _ => return Err(Error::invalid_file(&path, "expected a JSON object")),
                }
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, Value>) {
        if let Err(e) = write_atomic(&self.path, values) {
            tracing::error!("[store] Failed to persist {}: {e}", self.path.display());
        }
    }
}

fn write_atomic(path: &Path, values: &BTreeMap<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(values)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "store.json".to_string());
    let temp = path.with_file_name(format!("{file_name}.tmp.{}", std::process::id()));
    std::fs::write(&temp, json)?;
    std::fs::rename(&temp, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&temp);
    })?;
    Ok(())
}

impl HostStore for JsonFileStore {
    fn get_value(&self, key: &str, default: Value) -> Value {
        self.values.lock().get(key).cloned().unwrap_or(default)
    }

    fn set_value(&self, key: &str, value: Value) {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value);
        self.flush(&values);
    }

    fn delete_value(&self, key: &str) {
        let mut values = self.values.lock();
        if values.remove(key).is_some() {
            self.flush(&values);
        }
    }

    fn list_values(&self) -> Vec<String> {
        self.values.lock().keys().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// HTTP fetcher
// ---------------------------------------------------------------------------

/// `HostFetch` over reqwest with a timeout, a redirect limit and a body cap.
pub struct HttpFetcher {
    client: reqwest::Client,
    max_response_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &FrameworkConfig) -> std::result::Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {e}"))?;
        Ok(Self {
            client,
            max_response_bytes: config.max_response_bytes,
        })
    }
}

/// Only plain http/https URLs may be fetched.
fn validate_url(url: &str) -> std::result::Result<(), String> {
    let parsed = url::Url::parse(url).map_err(|e| format!("Invalid URL: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!(
            "Scheme \"{scheme}\" is not allowed; use http or https"
        )),
    }
}

#[async_trait]
impl HostFetch for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> std::result::Result<String, String> {
        validate_url(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read response body: {e}"))?;

        if body.len() > self.max_response_bytes {
            return Err(format!(
                "Response body exceeds maximum size ({} bytes > {} bytes)",
                body.len(),
                self.max_response_bytes
            ));
        }

        Ok(String::from_utf8_lossy(&body).to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
