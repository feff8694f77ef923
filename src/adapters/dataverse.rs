//! Record store backed by the Dataverse Web API (OData v4 over HTTPS).
//!
//! [`DataverseConnector::connect`] authenticates and probes `WhoAmI` once; the returned
//! [`DataverseStore`] then reports readiness from that probe, the way a service client
//! exposes whether its connection came up.

use crate::config::connection::{AuthType, ConnectionString};
use crate::domain::model::{format_date, NewTimeEntry, RecordId, TableSchema};
use crate::domain::ports::{RecordStore, StoreConnector};
use crate::utils::error::{Result, TimeEntryError};
use crate::utils::validation::Validate;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ENTITY_ID_HEADER: &str = "OData-EntityId";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ODataCollection {
    #[serde(default)]
    value: Vec<serde_json::Value>,
}

pub struct DataverseConnector {
    connection: ConnectionString,
    client: Client,
}

impl DataverseConnector {
    pub fn new(connection: ConnectionString) -> Result<Self> {
        connection.validate()?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { connection, client })
    }

    pub fn from_connection_str(raw: &str) -> Result<Self> {
        Self::new(ConnectionString::parse(raw)?)
    }

    /// Connects and fails instead of handing back a not-ready store.
    pub async fn connect_ready(&self) -> Result<DataverseStore> {
        let store = self.connect().await;
        if store.is_ready() {
            Ok(store)
        } else {
            Err(TimeEntryError::StoreUnavailable {
                message: store
                    .last_error()
                    .unwrap_or_else(|| "store reported not ready".to_string()),
            })
        }
    }

    async fn acquire_token(&self) -> Result<Option<String>> {
        if let Some(token) = &self.connection.token {
            return Ok(Some(token.clone()));
        }

        match self.connection.auth_type {
            AuthType::None | AuthType::Token => Ok(None),
            AuthType::OAuth => {
                tracing::debug!("Requesting access token from {}", self.connection.authority);
                let username = self.connection.username.as_deref().unwrap_or_default();
                let password = self.connection.password.as_deref().unwrap_or_default();
                let form = [
                    ("grant_type", "password"),
                    ("client_id", self.connection.client_id.as_str()),
                    ("resource", self.connection.url.as_str()),
                    ("username", username),
                    ("password", password),
                ];

                let response = self
                    .client
                    .post(&self.connection.authority)
                    .form(&form)
                    .send()
                    .await?;
                let response = check_status(response, "token request").await?;
                let token: TokenResponse = response.json().await?;
                Ok(Some(token.access_token))
            }
        }
    }

    async fn open(&self) -> Result<DataverseStore> {
        let token = self.acquire_token().await?;
        let store = DataverseStore {
            client: self.client.clone(),
            api_base: self.connection.api_base(),
            token,
            ready: true,
            last_error: None,
        };

        let response = store.request(Method::GET, "WhoAmI").send().await?;
        check_status(response, "WhoAmI probe").await?;
        Ok(store)
    }
}

#[async_trait]
impl StoreConnector for DataverseConnector {
    type Store = DataverseStore;

    async fn connect(&self) -> Self::Store {
        match self.open().await {
            Ok(store) => {
                tracing::debug!("🔌 Connected to {}", self.connection.url);
                store
            }
            Err(e) => {
                tracing::warn!("⚠️ Connection to {} failed: {}", self.connection.url, e);
                DataverseStore {
                    client: self.client.clone(),
                    api_base: self.connection.api_base(),
                    token: None,
                    ready: false,
                    last_error: Some(e.to_string()),
                }
            }
        }
    }
}

pub struct DataverseStore {
    client: Client,
    api_base: String,
    token: Option<String>,
    ready: bool,
    last_error: Option<String>,
}

impl DataverseStore {
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0");

        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl RecordStore for DataverseStore {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    async fn find_by_date(&self, schema: &TableSchema, date: NaiveDate) -> Result<Vec<RecordId>> {
        let filter = format!("{} eq {}", schema.start_field, format_date(date));
        let response = self
            .request(Method::GET, &schema.entity_set)
            .query(&[("$select", schema.id_field.as_str()), ("$filter", filter.as_str())])
            .send()
            .await?;
        let response = check_status(response, "lookup").await?;

        let collection: ODataCollection = response.json().await?;

        // 每一筆資料列都代表該日已有紀錄，讀不到主鍵時不能當作空日
        collection
            .value
            .iter()
            .map(|row| {
                row.get(&schema.id_field)
                    .and_then(|id| id.as_str())
                    .map(|id| RecordId(id.to_string()))
                    .ok_or_else(|| TimeEntryError::StoreResponse {
                        status: 200,
                        message: format!(
                            "lookup returned a row for {} without a '{}' value",
                            format_date(date),
                            schema.id_field
                        ),
                    })
            })
            .collect()
    }

    async fn insert(&self, schema: &TableSchema, entry: &NewTimeEntry) -> Result<RecordId> {
        let mut body = serde_json::Map::new();
        body.insert(schema.title_field.clone(), entry.title.clone().into());
        body.insert(schema.start_field.clone(), format_date(entry.start_date).into());
        body.insert(schema.end_field.clone(), format_date(entry.end_date).into());

        let response = self
            .request(Method::POST, &schema.entity_set)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header("Prefer", "return=representation")
            .json(&serde_json::Value::Object(body))
            .send()
            .await?;
        let response = check_status(response, "insert").await?;

        if let Some(id) = response
            .headers()
            .get(ENTITY_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_entity_id)
        {
            return Ok(RecordId(id));
        }

        // 沒有 OData-EntityId 時，從回傳的資料列讀取主鍵
        let text = response.text().await?;
        let row: serde_json::Value = serde_json::from_str(&text).map_err(|_| {
            TimeEntryError::StoreResponse {
                status: 200,
                message: "insert response carried no record id".to_string(),
            }
        })?;
        row.get(&schema.id_field)
            .and_then(|id| id.as_str())
            .map(|id| RecordId(id.to_string()))
            .ok_or_else(|| TimeEntryError::StoreResponse {
                status: 200,
                message: format!("insert response has no '{}' field", schema.id_field),
            })
    }
}

/// `https://org.crm.dynamics.com/api/data/v9.2/kk_timeentries(0000-...)` -> `0000-...`
pub fn parse_entity_id(header: &str) -> Option<String> {
    let start = header.rfind('(')?;
    let end = header.rfind(')')?;
    if end <= start + 1 {
        return None;
    }
    Some(header[start + 1..end].to_string())
}

pub(crate) async fn check_status(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(TimeEntryError::StoreResponse {
        status: status.as_u16(),
        message: format!("{} failed: {}", operation, truncate(&body, 300)),
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
