use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimeEntryError {
    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String },

    #[error("Payload field '{field}' is invalid: {message}")]
    SchemaViolation { field: String, message: String },

    #[error("Invalid range: StartOn {start_on} is later than EndOn {end_on}")]
    InvalidRange { start_on: NaiveDate, end_on: NaiveDate },

    #[error("Record store is not available: {message}")]
    StoreUnavailable { message: String },

    #[error("Record store {operation} failed for {date} after {inserted} inserts: {message}")]
    StoreOperation {
        operation: String,
        date: NaiveDate,
        inserted: usize,
        message: String,
    },

    #[error("Record store request failed: {0}")]
    StoreRequest(#[from] reqwest::Error),

    #[error("Record store responded with {status}: {message}")]
    StoreResponse { status: u16, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Payload,
    Store,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TimeEntryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TimeEntryError::MalformedPayload { .. }
            | TimeEntryError::SchemaViolation { .. }
            | TimeEntryError::InvalidRange { .. } => ErrorCategory::Payload,
            TimeEntryError::StoreUnavailable { .. }
            | TimeEntryError::StoreOperation { .. }
            | TimeEntryError::StoreRequest(_)
            | TimeEntryError::StoreResponse { .. } => ErrorCategory::Store,
            TimeEntryError::ConfigError { .. }
            | TimeEntryError::MissingConfigError { .. }
            | TimeEntryError::InvalidConfigValueError { .. }
            | TimeEntryError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            TimeEntryError::IoError(_) | TimeEntryError::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Payload => ErrorSeverity::Low,
            ErrorCategory::Store => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 呼叫端看到的只有「payload 無效」，細節只用於日誌
    pub fn is_payload_error(&self) -> bool {
        self.category() == ErrorCategory::Payload
    }

    pub fn is_store_error(&self) -> bool {
        self.category() == ErrorCategory::Store
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            TimeEntryError::MalformedPayload { .. } => {
                "Send a JSON object body such as {\"StartOn\": \"2022-01-03\", \"EndOn\": \"2022-01-05\"}"
            }
            TimeEntryError::SchemaViolation { .. } => {
                "Provide both StartOn and EndOn as YYYY-MM-DD strings"
            }
            TimeEntryError::InvalidRange { .. } => "Make sure StartOn is not later than EndOn",
            TimeEntryError::StoreUnavailable { .. }
            | TimeEntryError::StoreRequest(_)
            | TimeEntryError::StoreResponse { .. } => {
                "Check the connection string and that the record store is reachable, then retry"
            }
            TimeEntryError::StoreOperation { .. } => {
                "Retry the same request; days that were already inserted are skipped"
            }
            TimeEntryError::ConfigError { .. }
            | TimeEntryError::MissingConfigError { .. }
            | TimeEntryError::InvalidConfigValueError { .. }
            | TimeEntryError::ConfigValidationError { .. } => {
                "Review the settings file and the DATAVERSE_CONNECTION environment variable"
            }
            TimeEntryError::IoError(_) => "Check file paths and permissions",
            TimeEntryError::SerializationError(_) => "Check that the data is valid JSON",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Payload => "payload is not valid".to_string(),
            ErrorCategory::Store => "the record store is currently unavailable".to_string(),
            ErrorCategory::Configuration => format!("configuration problem: {}", self),
            ErrorCategory::System => format!("unexpected system error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, TimeEntryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_errors_share_category() {
        let malformed = TimeEntryError::MalformedPayload {
            message: "expected value".to_string(),
        };
        let schema = TimeEntryError::SchemaViolation {
            field: "StartOn".to_string(),
            message: "missing".to_string(),
        };
        let range = TimeEntryError::InvalidRange {
            start_on: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
            end_on: NaiveDate::from_ymd_opt(2022, 1, 2).unwrap(),
        };

        for err in [&malformed, &schema, &range] {
            assert!(err.is_payload_error());
            assert_eq!(err.user_friendly_message(), "payload is not valid");
        }
    }

    #[test]
    fn test_store_errors_do_not_leak_diagnostics() {
        let err = TimeEntryError::StoreUnavailable {
            message: "401 Unauthorized from https://org.crm.dynamics.com".to_string(),
        };
        assert!(err.is_store_error());
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(!err.user_friendly_message().contains("401"));
    }
}
