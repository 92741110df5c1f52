use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::UtcOffset;

pub const DEFAULT_PORT: u16 = 8001;
pub const DEFAULT_CREDENTIALS: &str = "serviceAccountKey.json";

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub addr: SocketAddr,
    pub root: PathBuf,
    pub local_offset: UtcOffset,
}

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub credentials: PathBuf,
    pub store: StoreSettings,
    pub dry_run: bool,
    pub local_offset: UtcOffset,
}

/// Where the sync reads from and writes to. Loaded from an optional TOML file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    /// Overrides the Firestore `documents` root derived from the project id.
    pub base_url: Option<String>,
    pub users_collection: String,
    pub requests_collection: String,
    pub summary_document: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            users_collection: "users".to_string(),
            requests_collection: "unlock_requests".to_string(),
            summary_document: "stats/growth_trend".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl StoreSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn base_url_for(&self, project_id: &str) -> String {
        match &self.base_url {
            Some(base_url) => base_url.clone(),
            None => format!(
                "https://firestore.googleapis.com/v1/projects/{project_id}/databases/(default)/documents"
            ),
        }
    }
}
