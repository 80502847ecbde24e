use crate::schema::{EntityDescriptor, FieldMapping};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Path segment between the database and the entity name
pub const ODATA_PATH: &str = "odata/standard.odata";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Unknown entity '{name}'. Configured entities: {known:?}")]
    UnknownEntity { name: String, known: Vec<String> },
    #[error("No base URL configured. Set [connection] base_url or pass --base-url")]
    MissingBaseUrl,
    #[error("Invalid [connection] {field} = {value}. Use a non-negative number of seconds")]
    InvalidTimeout { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub connection: ConnectionConfig,
    pub entities: BTreeMap<String, EntityConfig>,
}

impl ClientConfig {
    /// Descriptor for a configured entity
    pub fn descriptor<M>(&self, name: &str) -> Result<EntityDescriptor<M>, ConfigError> {
        let entity = self
            .entities
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEntity {
                name: name.to_string(),
                known: self.entities.keys().cloned().collect(),
            })?;
        let entity_name = entity.entity_name.as_deref().unwrap_or(name);
        Ok(EntityDescriptor::new(entity_name, entity.fields.clone()))
    }
}

/// Settings supplied once when a connection is opened
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Scheme and host, e.g. `http://localhost`
    pub base_url: String,
    /// Infobase / tenant path segment
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub connect_timeout_secs: f64,
    pub read_timeout_secs: f64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            database: String::new(),
            username: None,
            password: None,
            connect_timeout_secs: 10.0,
            read_timeout_secs: 121.0,
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Result<Duration, ConfigError> {
        timeout("connect_timeout_secs", self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Result<Duration, ConfigError> {
        timeout("read_timeout_secs", self.read_timeout_secs)
    }

    /// Root URL that entity names are appended to
    pub fn service_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let database = self.database.trim_matches('/');
        if database.is_empty() {
            format!("{base}/{ODATA_PATH}/")
        } else {
            format!("{base}/{database}/{ODATA_PATH}/")
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        self.connect_timeout()?;
        self.read_timeout()?;
        Ok(())
    }
}

/// Negative, NaN, infinite and overflowing values are rejected
fn timeout(field: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| ConfigError::InvalidTimeout { field, value: secs })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// Wire name of the entity; defaults to the table key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    pub fields: FieldMapping,
}

pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    if let Some(path) = path {
        load_config_from_path(path)
    } else {
        Ok(default_config().clone())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<ClientConfig, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    toml::from_str::<ClientConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display,
        source,
    })
}

pub fn default_config() -> &'static ClientConfig {
    static DEFAULT_CONFIG: LazyLock<ClientConfig> = LazyLock::new(ClientConfig::default);
    &DEFAULT_CONFIG
}
