use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of the framework config inside [`config_dir`].
pub const CONFIG_FILE: &str = "framework.json";

/// Get the config directory using platform-appropriate location.
///
/// - macOS: `~/Library/Application Support/qol-framework/`
/// - Linux: `~/.config/qol-framework/` (or `$XDG_CONFIG_HOME`)
/// - Windows: `%APPDATA%/qol-framework/`
///
/// Falls back to `~/.qol-framework/` if platform dir is unavailable.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("qol-framework"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".qol-framework")
        })
}

/// Load a JSON config file from [`config_dir`], returning Default if missing or corrupt.
pub fn load_json_config<T: DeserializeOwned + Default>(filename: &str) -> T {
    load_json_config_from(&config_dir().join(filename))
}

/// Load a JSON config file at `path`, returning Default if missing or corrupt.
/// Corrupt files are logged instead of silently resetting state.
pub fn load_json_config_from<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    let content = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("[config] Could not read {}: {e}", path.display());
            return T::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("[config] Corrupt config {}: {e}. Using defaults.", path.display());
            T::default()
        }
    }
}

/// Save a JSON config file into [`config_dir`] atomically.
pub fn save_json_config<T: Serialize>(filename: &str, config: &T) -> Result<(), String> {
    save_json_config_to(&config_dir(), filename, config)
}

/// Save a JSON config file atomically (temp file + rename).
/// Sets 0600 permissions on Unix.
pub fn save_json_config_to<T: Serialize>(
    dir: &Path,
    filename: &str,
    config: &T,
) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create config directory: {e}"))?;

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {e}"))?;

    let target = dir.join(filename);
    let temp = dir.join(format!("{}.tmp.{}", filename, std::process::id()));

    std::fs::write(&temp, &json).map_err(|e| format!("Failed to write temp config: {e}"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&temp, perms)
            .map_err(|e| format!("Failed to set config permissions: {e}"))?;
    }

    std::fs::rename(&temp, &target).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        format!("Failed to commit config: {e}")
    })?;

    Ok(())
}

// ---------------------------------------------------------------------------
// FrameworkConfig
// ---------------------------------------------------------------------------

/// Where a shared library comes from and what it exports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub url: String,
    /// Global the library defines, e.g. `TurndownService`.
    pub export: String,
    /// Pinned SHA-256 of the fetched source (lowercase hex). Unpinned
    /// sources load with a warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl DependencySpec {
    pub fn new(url: impl Into<String>, export: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            export: export.into(),
            sha256: None,
        }
    }

    pub fn pinned(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }
}

fn default_dependencies() -> BTreeMap<String, DependencySpec> {
    BTreeMap::from([
        (
            "turndown".to_string(),
            DependencySpec::new(
                "https://unpkg.com/turndown@7.1.2/dist/turndown.js",
                "TurndownService",
            ),
        ),
        (
            "readability".to_string(),
            DependencySpec::new(
                "https://unpkg.com/@mozilla/readability@0.5.0/Readability.js",
                "Readability",
            ),
        ),
    ])
}

fn default_storage_prefix() -> String {
    "qol_".to_string()
}
fn default_toast_duration_ms() -> u64 {
    3000
}
fn default_toast_grace_ms() -> u64 {
    300
}
fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_max_response_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_settings_button_label() -> String {
    "⚙️".to_string()
}
fn default_modal_title() -> String {
    "QoL Settings".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkConfig {
    /// Namespace for every persisted key: `{prefix}{scriptId}_{key}`.
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,
    /// Time a dismissed toast stays around for its exit animation.
    #[serde(default = "default_toast_grace_ms")]
    pub toast_grace_ms: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    #[serde(default = "default_dependencies")]
    pub dependencies: BTreeMap<String, DependencySpec>,
    #[serde(default = "default_settings_button_label")]
    pub settings_button_label: String,
    #[serde(default = "default_modal_title")]
    pub modal_title: String,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            storage_prefix: default_storage_prefix(),
            toast_duration_ms: default_toast_duration_ms(),
            toast_grace_ms: default_toast_grace_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_response_bytes: default_max_response_bytes(),
            dependencies: default_dependencies(),
            settings_button_label: default_settings_button_label(),
            modal_title: default_modal_title(),
        }
    }
}

impl FrameworkConfig {
    /// Load `framework.json` from the platform config dir.
    pub fn load() -> Self {
        load_json_config(CONFIG_FILE)
    }

    pub fn save(&self) -> Result<(), String> {
        save_json_config(CONFIG_FILE, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_values() {
        let cfg = FrameworkConfig::default();
        assert_eq!(cfg.storage_prefix, "qol_");
        assert_eq!(cfg.toast_duration_ms, 3000);
        assert_eq!(cfg.toast_grace_ms, 300);
        assert_eq!(cfg.dependencies["turndown"].export, "TurndownService");
        assert_eq!(cfg.dependencies["readability"].export, "Readability");
        assert!(cfg.dependencies["turndown"].sha256.is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: FrameworkConfig =
            serde_json::from_str(r#"{"storagePrefix": "test_", "toastDurationMs": 500}"#).unwrap();
        assert_eq!(cfg.storage_prefix, "test_");
        assert_eq!(cfg.toast_duration_ms, 500);
        assert_eq!(cfg.toast_grace_ms, 300);
        assert_eq!(cfg.dependencies.len(), 2);
        assert_eq!(cfg.modal_title, "QoL Settings");
    }

    #[test]
    fn dependency_table_can_be_replaced() {
        let cfg: FrameworkConfig = serde_json::from_str(
            r#"{"dependencies": {"marked": {"url": "https://cdn.example/marked.js", "export": "marked", "sha256": "abc"}}}"#,
        )
        .unwrap();
        assert_eq!(cfg.dependencies.len(), 1);
        assert_eq!(cfg.dependencies["marked"].sha256.as_deref(), Some("abc"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut cfg = FrameworkConfig::default();
        cfg.toast_duration_ms = 1234;
        save_json_config_to(dir.path(), CONFIG_FILE, &cfg).unwrap();

        let loaded: FrameworkConfig = load_json_config_from(&dir.path().join(CONFIG_FILE));
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let loaded: FrameworkConfig = load_json_config_from(&dir.path().join("nope.json"));
        assert_eq!(loaded, FrameworkConfig::default());
    }

    #[test]
    fn corrupt_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        let loaded: FrameworkConfig = load_json_config_from(&path);
        assert_eq!(loaded, FrameworkConfig::default());
    }

    #[cfg(unix)]
    #[test]
    fn saved_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        save_json_config_to(dir.path(), CONFIG_FILE, &FrameworkConfig::default()).unwrap();
        let mode = std::fs::metadata(dir.path().join(CONFIG_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
