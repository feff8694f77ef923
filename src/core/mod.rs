pub mod function;
pub mod payload;
pub mod reconciler;

pub use crate::domain::model::{DateRangeRequest, ReconciliationOutcome, TableSchema};
pub use crate::domain::ports::{RecordStore, StoreConnector};
pub use crate::utils::error::Result;
