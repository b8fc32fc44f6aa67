//! Settings file: engine tunables and saved command templates
//!
//! ```toml
//! [stream]
//! queue_capacity = 16
//! read_chunk_bytes = 8192
//!
//! [templates.billing]
//! f = "/var/log/app/@today@.log"
//! c = "module ~ billing and level = error"
//! o = "time,level,message"
//! ```

use crate::stream::StreamConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Flag name (`f`, `c`, `o`, `a`) to value
pub type Template = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Failed to write settings file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stream: StreamConfig,
    pub templates: BTreeMap<String, Template>,
}

/// `$HOME/.logview/settings.toml`, if a home directory is known
pub fn default_settings_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME").filter(|home| !home.is_empty())?;
    Some(PathBuf::from(home).join(".logview").join("settings.toml"))
}

/// Load settings, treating a missing file as default settings
pub fn load_config_from_path(path: &Path) -> Result<Settings, ConfigError> {
    let path_display = path.display().to_string();
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path_display,
                source,
            });
        }
    };

    toml::from_str::<Settings>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display,
        source,
    })
}

/// Read-modify-write access to one settings file
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Settings, ConfigError> {
        load_config_from_path(&self.path)
    }

    pub fn templates(&self) -> Result<BTreeMap<String, Template>, ConfigError> {
        Ok(self.load()?.templates)
    }

    pub fn template(&self, name: &str) -> Result<Option<Template>, ConfigError> {
        Ok(self.load()?.templates.remove(name))
    }

    /// Store a template under `name`. An empty template deletes it.
    pub fn save_template(&self, name: &str, template: Template) -> Result<(), ConfigError> {
        let mut settings = self.load()?;
        if template.is_empty() {
            settings.templates.remove(name);
        } else {
            settings.templates.insert(name.to_string(), template);
        }
        self.write(&settings)
    }

    fn write(&self, settings: &Settings) -> Result<(), ConfigError> {
        let path_display = self.path.display().to_string();
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
                path: path_display.clone(),
                source,
            })?;
        }
        let body = toml::to_string_pretty(settings)?;
        fs::write(&self.path, body).map_err(|source| ConfigError::Write {
            path: path_display,
            source,
        })
    }
}

/// Render a template as command-line flags, e.g. `-c "level = error" -f "app.log"`
pub fn describe_template(template: &Template) -> String {
    template
        .iter()
        .map(|(flag, value)| format!("-{flag} \"{value}\""))
        .collect::<Vec<_>>()
        .join(" ")
}
