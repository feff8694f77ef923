use crate::domain::model::{
    format_date, DateRangeRequest, NewTimeEntry, ReconciliationOutcome, TableSchema,
};
use crate::domain::ports::RecordStore;
use crate::utils::error::{Result, TimeEntryError};

/// Makes the store hold exactly one time entry per day of a requested range.
///
/// Days are handled one at a time: the existence check and the optional insert for a
/// day finish before the next day is looked at. Days that already have one or more
/// rows are left alone.
pub struct RangeReconciler<S: RecordStore> {
    store: S,
    schema: TableSchema,
}

impl<S: RecordStore> RangeReconciler<S> {
    pub fn new(store: S, schema: TableSchema) -> Self {
        Self { store, schema }
    }

    pub async fn reconcile(&self, request: &DateRangeRequest) -> Result<ReconciliationOutcome> {
        if !self.store.is_ready() {
            let message = self
                .store
                .last_error()
                .unwrap_or_else(|| "store reported not ready".to_string());
            tracing::error!("❌ Record store is not available: {}", message);
            return Err(TimeEntryError::StoreUnavailable { message });
        }

        tracing::debug!(
            "Reconciling {} day(s) from {} to {} in table {}",
            request.day_count(),
            request.start_on(),
            request.end_on(),
            self.schema.table
        );

        let mut inserted_ids = Vec::new();

        for day in request.days() {
            let existing = self
                .store
                .find_by_date(&self.schema, day)
                .await
                .map_err(|e| abort("lookup", day, inserted_ids.len(), e))?;

            if !existing.is_empty() {
                tracing::debug!("⏭️ {} already has {} entry(ies)", format_date(day), existing.len());
                continue;
            }

            let id = self
                .store
                .insert(&self.schema, &NewTimeEntry::for_day(day))
                .await
                .map_err(|e| abort("insert", day, inserted_ids.len(), e))?;

            tracing::debug!("➕ Inserted {} as {}", format_date(day), id);
            inserted_ids.push(id);
        }

        let outcome = ReconciliationOutcome::completed(inserted_ids);
        tracing::info!(
            "✅ Reconciled {} day(s), inserted {}",
            request.day_count(),
            outcome.inserted_count
        );
        Ok(outcome)
    }
}

// 中途失敗不回報部分數量，整個請求視為失敗
fn abort(
    operation: &str,
    day: chrono::NaiveDate,
    inserted: usize,
    source: TimeEntryError,
) -> TimeEntryError {
    tracing::error!(
        "❌ Store {} failed on {} after {} insert(s): {}",
        operation,
        format_date(day),
        inserted,
        source
    );
    TimeEntryError::StoreOperation {
        operation: operation.to_string(),
        date: day,
        inserted,
        message: source.to_string(),
    }
}
