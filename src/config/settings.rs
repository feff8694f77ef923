use crate::domain::model::TableSchema;
use crate::utils::error::{Result, TimeEntryError};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Local settings file (TOML), the counterpart of a function app's local settings.
///
/// ```toml
/// [values]
/// DATAVERSE_CONNECTION = "Url=https://org.crm.dynamics.com;AuthType=OAuth;Username=${DV_USER};Password=${DV_PASSWORD}"
///
/// [table]
/// table = "kk_timeentry"
///
/// [logging]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalSettings {
    #[serde(default)]
    pub values: HashMap<String, String>,
    pub table: Option<TableSchema>,
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
}

impl LocalSettings {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TimeEntryError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TimeEntryError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DV_PASSWORD})，找不到的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TimeEntryError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Non-empty value stored under `key` in `[values]`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn table_schema(&self) -> TableSchema {
        self.table.clone().unwrap_or_default()
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }
}

impl Validate for LocalSettings {
    fn validate(&self) -> Result<()> {
        if let Some(table) = &self.table {
            table.validate()?;
        }

        if let Some(level) = self.log_level() {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            if !valid_levels.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(TimeEntryError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.to_string(),
                    reason: format!("Valid levels: {}", valid_levels.join(", ")),
                });
            }
        }
        Ok(())
    }
}
