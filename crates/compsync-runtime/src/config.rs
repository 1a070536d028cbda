use std::path::{Path, PathBuf};
use std::sync::Arc;

use compsync_store::{LocalCache, Persistence, RemoteBackend};
use compsync_tree::AppStatus;
use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, RuntimeResult};

/// Where component storage goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Shared on-disk cache, one file per content hash.
    #[default]
    Local,
    /// Remote backend keyed by file id.
    Remote,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub cache_dir: PathBuf,
    pub storage_mode: StorageMode,
    pub file_id: Option<u64>,
    pub capture_events: bool,
    pub capture_call_stack: bool,
    pub reload_debounce_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            storage_mode: StorageMode::Local,
            file_id: None,
            capture_events: false,
            capture_call_stack: false,
            reload_debounce_ms: 300,
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(s: &str) -> RuntimeResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn reload_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.reload_debounce_ms)
    }

    /// Build the persistence target. Remote mode needs `backend`.
    pub fn persistence(&self, backend: Option<Arc<dyn RemoteBackend>>) -> RuntimeResult<Persistence> {
        match self.storage_mode {
            StorageMode::Local => {
                std::fs::create_dir_all(&self.cache_dir)?;
                Ok(Persistence::local(LocalCache::new(&self.cache_dir)))
            }
            StorageMode::Remote => {
                let backend = backend.ok_or_else(|| {
                    RuntimeError::Config("remote storage mode needs a backend".into())
                })?;
                Ok(Persistence::Remote {
                    backend,
                    file_id: self.file_id,
                })
            }
        }
    }

    /// Copy the debug capture flags onto `status`.
    pub fn apply(&self, status: &mut AppStatus) {
        status.capture_events = self.capture_events;
        status.capture_call_stack = self.capture_call_stack;
    }
}

/// `~/.cache/webapp_local_storage`, or a relative path when there is no home.
pub fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cache")
        .join("webapp_local_storage")
}

#[cfg(test)]
mod tests {
    use super::*;
    use compsync_store::InMemoryBackend;

    #[test]
    fn default_config() {
        let c = RuntimeConfig::default();
        assert_eq!(c.storage_mode, StorageMode::Local);
        assert_eq!(c.reload_debounce_ms, 300);
        assert!(c.file_id.is_none());
        assert!(!c.capture_events);
        assert!(c.cache_dir.ends_with(".cache/webapp_local_storage"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = RuntimeConfig::from_toml_str(
            r#"
            storage_mode = "remote"
            file_id = 42
            capture_events = true
            "#,
        )
        .unwrap();
        assert_eq!(c.storage_mode, StorageMode::Remote);
        assert_eq!(c.file_id, Some(42));
        assert!(c.capture_events);
        assert_eq!(c.reload_debounce_ms, 300);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(matches!(
            RuntimeConfig::from_toml_str(r#"storage_mode = "ftp""#),
            Err(RuntimeError::Toml(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compsync.toml");
        std::fs::write(&path, "reload_debounce_ms = 50\n").unwrap();
        let c = RuntimeConfig::load(&path).unwrap();
        assert_eq!(c.reload_debounce(), std::time::Duration::from_millis(50));
    }

    #[test]
    fn local_persistence_creates_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig {
            cache_dir: dir.path().join("cache"),
            ..RuntimeConfig::default()
        };
        let persistence = config.persistence(None).unwrap();
        assert!(!persistence.is_remote());
        assert!(dir.path().join("cache").is_dir());
    }

    #[test]
    fn remote_persistence_needs_backend() {
        let config = RuntimeConfig {
            storage_mode: StorageMode::Remote,
            file_id: Some(1),
            ..RuntimeConfig::default()
        };
        assert!(matches!(config.persistence(None), Err(RuntimeError::Config(_))));
        let backend: Arc<dyn RemoteBackend> = Arc::new(InMemoryBackend::new());
        assert!(config.persistence(Some(backend)).unwrap().is_remote());
    }

    #[test]
    fn apply_sets_capture_flags() {
        let config = RuntimeConfig {
            capture_events: true,
            capture_call_stack: true,
            ..RuntimeConfig::default()
        };
        let mut status = AppStatus::new();
        config.apply(&mut status);
        assert!(status.capture_events && status.capture_call_stack);
    }
}
