#[cfg(feature = "cli")]
pub mod cli;
pub mod connection;
pub mod lambda;
pub mod settings;

use crate::utils::error::{Result, TimeEntryError};
use settings::LocalSettings;
use std::path::PathBuf;

pub const DEFAULT_CONNECTION_ENV_KEY: &str = "DATAVERSE_CONNECTION";
pub const DEFAULT_SETTINGS_FILE: &str = "time-entry.toml";
/// Used when neither the environment nor the settings file provide a connection.
pub const DEFAULT_CONNECTION: &str = "Url=http://127.0.0.1:7071;AuthType=None";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSource {
    Override,
    Environment,
    SettingsFile,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    pub value: String,
    pub source: ConnectionSource,
}

/// Finds the store connection string: explicit override, then the environment
/// variable, then `[values]` of the settings file, then the hardcoded fallback.
#[derive(Debug, Clone)]
pub struct ConnectionResolver {
    env_key: String,
    settings_path: Option<PathBuf>,
    fallback: String,
    override_value: Option<String>,
}

impl ConnectionResolver {
    pub fn new() -> Self {
        Self {
            env_key: DEFAULT_CONNECTION_ENV_KEY.to_string(),
            settings_path: None,
            fallback: DEFAULT_CONNECTION.to_string(),
            override_value: None,
        }
    }

    pub fn with_env_key(mut self, env_key: impl Into<String>) -> Self {
        self.env_key = env_key.into();
        self
    }

    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn with_override(mut self, value: Option<String>) -> Self {
        self.override_value = value;
        self
    }

    pub fn env_key(&self) -> &str {
        &self.env_key
    }

    pub fn resolve(&self) -> ResolvedConnection {
        if let Some(value) = non_empty(self.override_value.clone()) {
            return ResolvedConnection {
                value,
                source: ConnectionSource::Override,
            };
        }

        if let Some(value) = non_empty(std::env::var(&self.env_key).ok()) {
            tracing::debug!("Connection taken from environment variable {}", self.env_key);
            return ResolvedConnection {
                value,
                source: ConnectionSource::Environment,
            };
        }

        if let Some(value) = self
            .load_settings()
            .and_then(|settings| settings.value(&self.env_key).map(str::to_string))
        {
            tracing::debug!("Connection taken from settings file");
            return ResolvedConnection {
                value,
                source: ConnectionSource::SettingsFile,
            };
        }

        tracing::debug!("Using fallback connection");
        ResolvedConnection {
            value: self.fallback.clone(),
            source: ConnectionSource::Fallback,
        }
    }

    /// Missing or broken settings files are not fatal, resolution falls through.
    pub fn load_settings(&self) -> Option<LocalSettings> {
        match self.try_load_settings() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("⚠️ {}", e);
                None
            }
        }
    }

    /// `Ok(None)` when no settings file is configured or it does not exist.
    ///
    /// Hosts that load settings before their logger is up use this and report the
    /// error themselves once logging works.
    pub fn try_load_settings(&self) -> Result<Option<LocalSettings>> {
        let path = match self.settings_path.as_ref() {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            tracing::debug!("Settings file {} not found", path.display());
            return Ok(None);
        }

        LocalSettings::from_file(path)
            .map(Some)
            .map_err(|e| TimeEntryError::ConfigError {
                message: format!("Unable to load settings file {}: {}", path.display(), e),
            })
    }
}

impl Default for ConnectionResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
