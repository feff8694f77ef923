use crate::domain::model::{format_date, NewTimeEntry, RecordId, TableSchema, TimeEntryRecord};
use crate::domain::ports::{RecordStore, StoreConnector};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Process-local record store. Clones share the same tables, so a clone handed to the
/// reconciler can be inspected afterwards.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<HashMap<String, Vec<TimeEntryRecord>>>>,
    ready: bool,
    last_error: Option<String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(HashMap::new())),
            ready: true,
            last_error: None,
        }
    }

    /// A store that reports not-ready with the given diagnostic.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            ready: false,
            last_error: Some(reason.into()),
            ..Self::new()
        }
    }

    /// Adds a row for `date` to the default table without any existence check.
    pub async fn seed(&self, date: NaiveDate) -> RecordId {
        self.push(&TableSchema::default().table, NewTimeEntry::for_day(date))
            .await
    }

    /// Rows of the default table in insertion order.
    pub async fn records(&self) -> Vec<TimeEntryRecord> {
        self.records_in(&TableSchema::default().table).await
    }

    pub async fn records_in(&self, table: &str) -> Vec<TimeEntryRecord> {
        let tables = self.tables.lock().await;
        tables.get(table).cloned().unwrap_or_default()
    }

    pub async fn count_for(&self, date: NaiveDate) -> usize {
        self.records()
            .await
            .iter()
            .filter(|record| record.start_date == date)
            .count()
    }

    async fn push(&self, table: &str, entry: NewTimeEntry) -> RecordId {
        let id = RecordId(uuid::Uuid::new_v4().to_string());
        let mut tables = self.tables.lock().await;
        tables
            .entry(table.to_string())
            .or_default()
            .push(TimeEntryRecord {
                id: id.clone(),
                title: entry.title,
                start_date: entry.start_date,
                end_date: entry.end_date,
            });
        id
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    async fn find_by_date(&self, schema: &TableSchema, date: NaiveDate) -> Result<Vec<RecordId>> {
        let tables = self.tables.lock().await;
        let ids = tables
            .get(&schema.table)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| record.start_date == date)
                    .map(|record| record.id.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    async fn insert(&self, schema: &TableSchema, entry: &NewTimeEntry) -> Result<RecordId> {
        let id = self.push(&schema.table, entry.clone()).await;
        tracing::debug!("In-memory insert into {}: {} -> {}", schema.table, format_date(entry.start_date), id);
        Ok(id)
    }
}

#[async_trait]
impl StoreConnector for InMemoryStore {
    type Store = InMemoryStore;

    async fn connect(&self) -> Self::Store {
        self.clone()
    }
}
