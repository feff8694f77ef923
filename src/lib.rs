pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::dataverse::{DataverseConnector, DataverseStore};
pub use adapters::memory::InMemoryStore;
pub use adapters::provisioning::{ProvisionOutcome, TableProvisioner};
pub use config::{ConnectionResolver, ConnectionSource};
pub use crate::core::function::{FunctionResponse, TimeEntryFunction};
pub use crate::core::reconciler::RangeReconciler;
pub use domain::model::{DateRangeRequest, ReconciliationOutcome, TableSchema};
pub use utils::error::{Result, TimeEntryError};
