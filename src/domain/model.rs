use crate::utils::error::{Result, TimeEntryError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical date string used for titles, filters and inserted values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// A validated, inclusive date range. `start_on <= end_on` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRangeRequest {
    start_on: NaiveDate,
    end_on: NaiveDate,
}

impl DateRangeRequest {
    pub fn new(start_on: NaiveDate, end_on: NaiveDate) -> Result<Self> {
        if start_on > end_on {
            return Err(TimeEntryError::InvalidRange { start_on, end_on });
        }
        Ok(Self { start_on, end_on })
    }

    pub fn start_on(&self) -> NaiveDate {
        self.start_on
    }

    pub fn end_on(&self) -> NaiveDate {
        self.end_on
    }

    pub fn day_count(&self) -> usize {
        (self.end_on - self.start_on).num_days() as usize + 1
    }

    /// Every day of the range in ascending order, both ends included.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end_on = self.end_on;
        self.start_on.iter_days().take_while(move |day| *day <= end_on)
    }

    /// The wire payload this request was (or could have been) parsed from.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "StartOn": format_date(self.start_on),
            "EndOn": format_date(self.end_on),
        })
        .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Column values of a time entry about to be created. One row per day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTimeEntry {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewTimeEntry {
    pub fn for_day(day: NaiveDate) -> Self {
        Self {
            title: format_date(day),
            start_date: day,
            end_date: day,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntryRecord {
    pub id: RecordId,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationOutcome {
    pub succeeded: bool,
    pub inserted_count: usize,
    pub inserted_ids: Vec<RecordId>,
}

impl ReconciliationOutcome {
    pub fn completed(inserted_ids: Vec<RecordId>) -> Self {
        Self {
            succeeded: true,
            inserted_count: inserted_ids.len(),
            inserted_ids,
        }
    }

    pub fn message(&self) -> String {
        format!("{} time entries inserted.", self.inserted_count)
    }
}

/// Table and column names shared by the reconciler, the store adapters and provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSchema {
    pub table: String,
    pub entity_set: String,
    pub id_field: String,
    pub title_field: String,
    pub start_field: String,
    pub end_field: String,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            table: "kk_timeentry".to_string(),
            entity_set: "kk_timeentries".to_string(),
            id_field: "kk_timeentryid".to_string(),
            title_field: "kk_title".to_string(),
            start_field: "kk_start".to_string(),
            end_field: "kk_end".to_string(),
        }
    }
}

impl crate::utils::validation::Validate for TableSchema {
    fn validate(&self) -> Result<()> {
        use crate::utils::validation::validate_identifier;

        validate_identifier("table.table", &self.table)?;
        validate_identifier("table.entity_set", &self.entity_set)?;
        validate_identifier("table.id_field", &self.id_field)?;
        validate_identifier("table.title_field", &self.title_field)?;
        validate_identifier("table.start_field", &self.start_field)?;
        validate_identifier("table.end_field", &self.end_field)?;

        if self.start_field == self.end_field {
            return Err(TimeEntryError::ConfigValidationError {
                field: "table.end_field".to_string(),
                message: "start and end columns must differ".to_string(),
            });
        }
        Ok(())
    }
}
