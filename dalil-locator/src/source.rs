//! Configuration sources backed by files and strings.
//!
//! # Examples
//! ```no_run
//! use dalil_locator::source::{FileSource, Format};
//!
//! // Finds the first of ./config/services.yaml, ./config/services.yml,
//! // /etc/app/services.yaml, /etc/app/services.yml
//! let source = FileSource::new("services", Format::Yaml)
//!     .add_search_path("./config")
//!     .add_search_path("/etc/app");
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, trace};

use crate::argument::BoxError;
use crate::config::{ConfigError, ConfigSource, ServiceConfigMap};

/// Encoding of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    #[cfg(feature = "yaml")]
    Yaml,
    Json,
}

impl Format {
    /// File extensions tried for this format, in order.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "yaml")]
            Format::Yaml => &["yaml", "yml"],
            Format::Json => &["json"],
        }
    }

    /// Decodes `text`. `origin` names the document in errors.
    pub fn decode(&self, text: &str, origin: &str) -> Result<ServiceConfigMap, ConfigError> {
        // An empty document is an empty configuration, not an error.
        if text.trim().is_empty() {
            return Ok(ServiceConfigMap::new());
        }

        // Syntax first, then structure, so the two fail differently
        let shape = |source: BoxError| ConfigError::Shape {
            origin: origin.to_string(),
            source,
        };
        match self {
            #[cfg(feature = "yaml")]
            Format::Yaml => {
                let document: serde_yaml::Value =
                    serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
                        origin: origin.to_string(),
                        source,
                    })?;
                serde_yaml::from_value(document).map_err(|e| shape(e.into()))
            }
            Format::Json => {
                let document: serde_json::Value =
                    serde_json::from_str(text).map_err(|source| ConfigError::Json {
                        origin: origin.to_string(),
                        source,
                    })?;
                serde_json::from_value(document).map_err(|e| shape(e.into()))
            }
        }
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            _ => Err(ConfigError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "yaml")]
            Format::Yaml => write!(f, "yaml"),
            Format::Json => write!(f, "json"),
        }
    }
}

/// Reads configuration from the first matching file in a list of
/// directories.
///
/// The file is `<name>.<ext>` for each extension of the format. With no
/// search paths, the current directory is searched.
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    format: Format,
    search_paths: Vec<PathBuf>,
}

impl FileSource {
    pub fn new(name: impl Into<String>, format: Format) -> Self {
        Self {
            name: name.into(),
            format,
            search_paths: Vec::new(),
        }
    }

    /// Like [`FileSource::new`], with the format given by name
    /// (`yaml`, `yml` or `json`).
    pub fn with_format_name(name: impl Into<String>, format: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(name, format.parse()?))
    }

    /// Adds a directory to search, after the ones already added.
    pub fn add_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Returns the first existing candidate file.
    pub fn find(&self) -> Result<PathBuf, ConfigError> {
        let current = [PathBuf::from(".")];
        let dirs: &[PathBuf] = if self.search_paths.is_empty() {
            &current
        } else {
            &self.search_paths
        };

        for dir in dirs {
            for ext in self.format.extensions() {
                let candidate = dir.join(format!("{}.{ext}", self.name));
                trace!(path = %candidate.display(), "Trying config file");
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }

        Err(ConfigError::NotFound {
            file: self.name.clone(),
            searched: dirs.to_vec(),
        })
    }

    fn read(&self, path: &Path) -> Result<ServiceConfigMap, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), format = %self.format, "Reading service config");
        self.format.decode(&text, &path.display().to_string())
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<ServiceConfigMap, ConfigError> {
        let path = self.find()?;
        self.read(&path)
    }

    fn describe(&self) -> String {
        format!("{}.{} file", self.name, self.format)
    }
}

/// Configuration held in a string, e.g. embedded with `include_str!`.
#[derive(Debug, Clone)]
pub struct InlineSource {
    format: Format,
    text: String,
}

impl InlineSource {
    pub fn new(format: Format, text: impl Into<String>) -> Self {
        Self {
            format,
            text: text.into(),
        }
    }
}

impl ConfigSource for InlineSource {
    fn load(&self) -> Result<ServiceConfigMap, ConfigError> {
        self.format.decode(&self.text, "inline config")
    }

    fn describe(&self) -> String {
        format!("inline {} config", self.format)
    }
}
