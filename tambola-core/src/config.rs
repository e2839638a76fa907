use crate::error::{Result, TambolaError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.json";
pub const LOCAL_DB_FILE: &str = "tambola.db";
pub const GAMES_DB_FILE: &str = "games.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TambolaConfig {
    pub data_dir: PathBuf,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Shared database file; defaults to `games.db` in the data dir.
    pub path: Option<PathBuf>,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

impl Default for TambolaConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            store: StoreConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: None,
            poll_interval_ms: 250,
        }
    }
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl TambolaConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let mut config = Self::default();
        config.store.path = Some(data_dir.join(GAMES_DB_FILE));
        config.data_dir = data_dir;
        config
    }

    /// Reads `config.json` from the data dir if present.
    pub async fn load_or_default(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str::<TambolaConfig>(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::new(data_dir),
            Err(e) => return Err(e.into()),
        };

        config.data_dir = data_dir.to_path_buf();
        if config.store.path.is_none() {
            config.store.path = Some(data_dir.join(GAMES_DB_FILE));
        }

        tracing::debug!("Loaded config for data dir {}", data_dir.display());
        Ok(config)
    }

    pub fn local_db_path(&self) -> PathBuf {
        self.data_dir.join(LOCAL_DB_FILE)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.poll_interval_ms == 0 {
            return Err(TambolaError::config("Poll interval must be greater than 0"));
        }

        if self.store.backend == StoreBackend::Sqlite && self.store.path.is_none() {
            return Err(TambolaError::config(
                "SQLite game store requires a database path",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_new_points_store_into_data_dir() {
        let config = TambolaConfig::new("/tmp/tambola");
        assert_eq!(
            config.store.path.as_deref(),
            Some(Path::new("/tmp/tambola/games.db"))
        );
        assert_eq!(config.local_db_path(), Path::new("/tmp/tambola/tambola.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let mut config = TambolaConfig::new("/tmp/tambola");
        config.store.poll_interval_ms = 0;
        assert!(matches!(config.validate(), Err(TambolaError::Config(_))));
    }

    #[tokio::test]
    async fn test_load_reads_config_file() {
        let dir = tempdir().unwrap();
        let raw = r#"{
            "data_dir": "ignored",
            "store": { "backend": "Memory", "path": null, "poll_interval_ms": 40 }
        }"#;
        tokio::fs::write(dir.path().join(CONFIG_FILE), raw)
            .await
            .unwrap();

        let config = TambolaConfig::load_or_default(dir.path()).await.unwrap();
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.poll_interval_ms, 40);
        assert_eq!(config.store.path, Some(dir.path().join(GAMES_DB_FILE)));
    }

    #[tokio::test]
    async fn test_load_without_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = TambolaConfig::load_or_default(dir.path()).await.unwrap();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.poll_interval_ms, 250);
    }
}
