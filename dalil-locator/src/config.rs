//! Service configuration: which constructor builds a service, and with
//! which arguments.
//!
//! The [`ConfigStore`] pulls the whole mapping from a [`ConfigSource`]
//! on its first lookup and keeps the outcome for its lifetime. A failed
//! load is kept too: no partial configuration is ever served.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::argument::BoxError;

/// How to build one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Name of a registered constructor.
    pub constructor: String,
    /// Positional arguments. A string that is exactly `%name%` refers to
    /// service `name`; anything else is passed through as is.
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl ServiceConfig {
    pub fn new(constructor: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            constructor: constructor.into(),
            arguments,
        }
    }
}

/// Decoded configuration: service name → [`ServiceConfig`].
pub type ServiceConfigMap = HashMap<String, ServiceConfig>;

/// Errors raised while reading or decoding a configuration source.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No candidate file exists in any search path.
    #[error("Config file {file:?} not found in {}", render_paths(.searched))]
    NotFound { file: String, searched: Vec<PathBuf> },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "yaml")]
    #[error("Invalid YAML in {origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid JSON in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// The document parsed, but is not a map of service configs.
    #[error("Invalid service config in {origin}: {source}")]
    Shape {
        origin: String,
        #[source]
        source: BoxError,
    },

    /// The requested format is not one the locator can decode.
    #[error("Unsupported config format {0:?}, expected one of: yaml, yml, json")]
    UnsupportedFormat(String),
}

fn render_paths(paths: &[PathBuf]) -> String {
    let rendered: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!("[{}]", rendered.join(", "))
}

/// Produces the decoded service configuration.
///
/// Called at most once per [`ConfigStore`].
pub trait ConfigSource {
    fn load(&self) -> Result<ServiceConfigMap, ConfigError>;

    /// Human-readable origin, for log and error messages.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl ConfigSource for ServiceConfigMap {
    fn load(&self) -> Result<ServiceConfigMap, ConfigError> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory config ({} services)", self.len())
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for Box<S> {
    fn load(&self) -> Result<ServiceConfigMap, ConfigError> {
        (**self).load()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Load progress of a [`ConfigStore`].
#[derive(Debug)]
enum LoadState {
    Unloaded,
    Loaded(ServiceConfigMap),
    Failed(Arc<ConfigError>),
}

/// Lazily loaded, memoized service configuration.
pub(crate) struct ConfigStore {
    source: Option<Box<dyn ConfigSource>>,
    state: LoadState,
}

impl ConfigStore {
    /// A store that loads from `source` on first use.
    pub fn from_source(source: Box<dyn ConfigSource>) -> Self {
        Self {
            source: Some(source),
            state: LoadState::Unloaded,
        }
    }

    /// An already loaded, empty store.
    pub fn empty() -> Self {
        Self {
            source: None,
            state: LoadState::Loaded(ServiceConfigMap::new()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded(_))
    }

    /// Returns the loaded entries, loading them first if needed.
    fn entries(&mut self) -> Result<&mut ServiceConfigMap, Arc<ConfigError>> {
        if let LoadState::Unloaded = self.state {
            self.state = self.load();
        }

        match &mut self.state {
            LoadState::Loaded(entries) => Ok(entries),
            LoadState::Failed(error) => Err(error.clone()),
            LoadState::Unloaded => unreachable!("config load state settled above"),
        }
    }

    /// Returns the config of `name`, or `None` if it has none.
    pub fn lookup(&mut self, name: &str) -> Result<Option<ServiceConfig>, Arc<ConfigError>> {
        trace!(service = %name, "Looking up service config");
        Ok(self.entries()?.get(name).cloned())
    }

    /// Returns `true` if `name` has a config.
    pub fn contains(&mut self, name: &str) -> Result<bool, Arc<ConfigError>> {
        Ok(self.entries()?.contains_key(name))
    }

    /// Adds the config of `name` unless it already has one.
    ///
    /// Returns `false`, leaving the existing entry untouched, if it does.
    pub fn insert_new(&mut self, name: String, config: ServiceConfig) -> Result<bool, Arc<ConfigError>> {
        let entries = self.entries()?;
        if entries.contains_key(&name) {
            return Ok(false);
        }
        debug!(service = %name, constructor = %config.constructor, "Added service config");
        entries.insert(name, config);
        Ok(true)
    }

    /// Names of all configured services. Empty until loaded.
    pub fn names(&self) -> Vec<&str> {
        match &self.state {
            LoadState::Loaded(entries) => entries.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    fn load(&self) -> LoadState {
        let Some(source) = &self.source else {
            return LoadState::Loaded(ServiceConfigMap::new());
        };

        let origin = source.describe();
        match source.load() {
            Ok(entries) => {
                debug!(source = %origin, services = entries.len(), "Loaded service config");
                LoadState::Loaded(entries)
            }
            Err(error) => {
                warn!(source = %origin, error = %error, "Service config failed to load");
                LoadState::Failed(Arc::new(error))
            }
        }
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("source", &self.source.as_ref().map(|s| s.describe()))
            .field("state", &self.state)
            .finish()
    }
}
