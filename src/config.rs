use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::storage::StoreConfig;
use crate::{Error, Result};

/// Environment variable that overrides `database.path`
pub const DATABASE_ENV_VAR: &str = "SKYWATCH_DATABASE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SkywatchConfig {
    pub server: ServerConfig,
    pub database: StoreConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
        }
    }
}

/// Cross-origin policy.
///
/// Defaults to allowing every origin, which is only suitable for local
/// development. List explicit origins before exposing the service.
///
/// Credentialed requests (cookies, `Authorization`) are allowed only for an
/// explicit origin list; browsers refuse credentials with a `*` origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
        }
    }
}

impl CorsConfig {
    pub fn is_permissive(&self) -> bool {
        self.allow_origins.iter().any(|origin| origin == "*")
    }
}

impl SkywatchConfig {
    /// Load the config file (if present) and apply the environment override
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = load_config(path)?.unwrap_or_default();
        config.apply_database_override(std::env::var(DATABASE_ENV_VAR).ok());
        Ok(config)
    }

    /// Replace the store path when an override is given
    pub fn apply_database_override(&mut self, path: Option<String>) {
        if let Some(path) = path.filter(|p| !p.trim().is_empty()) {
            tracing::debug!("Using store path {} from override", path);
            self.database.path = PathBuf::from(path);
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("skywatch.toml")
}

pub fn load_config(path: Option<&Path>) -> Result<Option<SkywatchConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: SkywatchConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}

pub fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JournalMode;

    #[test]
    fn test_defaults() {
        let config = SkywatchConfig::default();
        assert_eq!(config.server.bind.to_string(), "127.0.0.1:8000");
        assert_eq!(config.database.path, PathBuf::from("skywatch.db"));
        assert!(config.cors.is_permissive());
    }

    #[test]
    fn test_load_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skywatch.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "0.0.0.0:9000"

[database]
path = "data/reports.db"
busy_timeout_ms = 250
journal_mode = "delete"

[cors]
allow_origins = ["https://skywatch.example"]
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.database.path, PathBuf::from("data/reports.db"));
        assert_eq!(config.database.busy_timeout_ms, 250);
        assert_eq!(config.database.journal_mode, JournalMode::Delete);
        assert!(!config.cors.is_permissive());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: SkywatchConfig = toml::from_str("[database]\npath = \"x.db\"\n").unwrap();
        assert_eq!(config.database.path, PathBuf::from("x.db"));
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.cors, CorsConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skywatch.toml");
        std::fs::write(&path, "[server]\nbind = 42\n").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(Error::Config(_))));
    }

    #[test]
    fn test_database_override() {
        let mut config = SkywatchConfig::default();
        config.apply_database_override(Some("  ".to_string()));
        assert_eq!(config.database.path, PathBuf::from("skywatch.db"));

        config.apply_database_override(Some("/srv/skywatch.db".to_string()));
        assert_eq!(config.database.path, PathBuf::from("/srv/skywatch.db"));
    }

    #[test]
    fn test_ensure_db_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("deeper").join("skywatch.db");
        ensure_db_dir(&db_path).unwrap();
        assert!(db_path.parent().unwrap().is_dir());
    }
}
