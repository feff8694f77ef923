use crate::adapters::dataverse::DataverseConnector;
use crate::config::{ConnectionResolver, DEFAULT_CONNECTION_ENV_KEY, DEFAULT_SETTINGS_FILE};
use crate::core::function::{FunctionResponse, TimeEntryFunction};
use crate::domain::model::TableSchema;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// API Gateway proxy style request. Only the method and the body are used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl From<FunctionResponse> for Response {
    fn from(response: FunctionResponse) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "text/plain; charset=utf-8".to_string());
        Self {
            status_code: response.status,
            headers,
            body: response.body,
        }
    }
}

/// Serverless host configuration, read from the function's environment.
#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub connection_env_key: String,
    pub settings_path: Option<PathBuf>,
}

impl LambdaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// `TIME_ENTRY_SETTINGS` wins; otherwise the settings file is looked up next to the
    /// deployed function (`LAMBDA_TASK_ROOT`).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings_path = lookup("TIME_ENTRY_SETTINGS")
            .map(PathBuf::from)
            .or_else(|| lookup("LAMBDA_TASK_ROOT").map(|root| PathBuf::from(root).join(DEFAULT_SETTINGS_FILE)));

        Self {
            connection_env_key: lookup("CONNECTION_ENV_KEY")
                .unwrap_or_else(|| DEFAULT_CONNECTION_ENV_KEY.to_string()),
            settings_path,
        }
    }

    pub fn resolver(&self) -> ConnectionResolver {
        let resolver = ConnectionResolver::new().with_env_key(self.connection_env_key.clone());
        match &self.settings_path {
            Some(path) => resolver.with_settings_path(path),
            None => resolver,
        }
    }

    /// Validated table schema. A missing settings file means the default schema; an
    /// unreadable or invalid one is an error.
    pub fn table_schema(&self) -> Result<TableSchema> {
        match self.resolver().try_load_settings()? {
            Some(settings) => {
                settings.validate()?;
                Ok(settings.table_schema())
            }
            None => Ok(TableSchema::default()),
        }
    }

    /// Maps one proxy event to its response. Configuration is read per invocation.
    pub async fn handle(&self, request: Request) -> Response {
        if let Some(method) = &request.http_method {
            if !method.eq_ignore_ascii_case("POST") {
                tracing::warn!("🚫 Method {} is not allowed", method);
                return Response::from(FunctionResponse {
                    status: 405,
                    body: String::new(),
                });
            }
        }

        // 二進位 body 不是合法的 payload，交給驗證器當作格式錯誤處理
        let body = if request.is_base64_encoded {
            String::new()
        } else {
            request.body.unwrap_or_default()
        };

        let schema = match self.table_schema() {
            Ok(schema) => schema,
            Err(e) => {
                tracing::error!("❌ Settings validation failed: {}", e);
                return Response::from(FunctionResponse::service_unavailable());
            }
        };

        let resolved = self.resolver().resolve();
        tracing::info!("Connection resolved from {:?}", resolved.source);

        let connector = match DataverseConnector::from_connection_str(&resolved.value) {
            Ok(connector) => connector,
            Err(e) => {
                tracing::error!("❌ Invalid connection string: {}", e);
                return Response::from(FunctionResponse::service_unavailable());
            }
        };

        Response::from(TimeEntryFunction::new(connector, schema).run(&body).await)
    }
}
