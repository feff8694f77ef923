use crate::domain::model::{NewTimeEntry, RecordId, TableSchema};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Query-by-date and insert-by-date capability over the time entry table.
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn is_ready(&self) -> bool;

    /// Diagnostic explaining why the store is not ready, if known.
    fn last_error(&self) -> Option<String>;

    async fn find_by_date(&self, schema: &TableSchema, date: NaiveDate) -> Result<Vec<RecordId>>;

    async fn insert(&self, schema: &TableSchema, entry: &NewTimeEntry) -> Result<RecordId>;
}

/// Opens one store connection per request. A failed connection is reported through
/// `RecordStore::is_ready`, not as an error.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: RecordStore;

    async fn connect(&self) -> Self::Store;
}
