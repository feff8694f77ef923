use crate::adapters::dataverse::{check_status, DataverseStore};
use crate::domain::model::TableSchema;
use crate::domain::ports::RecordStore;
use crate::utils::error::{Result, TimeEntryError};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

const LANGUAGE_CODE: u32 = 1033;
const TITLE_MAX_LENGTH: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    AlreadyExists,
    Created,
}

/// Creates the time entry table and its date columns when they are missing.
/// Administrative bootstrap, run once per environment rather than per request.
pub struct TableProvisioner<'a> {
    store: &'a DataverseStore,
    schema: &'a TableSchema,
}

impl<'a> TableProvisioner<'a> {
    pub fn new(store: &'a DataverseStore, schema: &'a TableSchema) -> Self {
        Self { store, schema }
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.store.is_ready() {
            return Ok(());
        }
        Err(TimeEntryError::StoreUnavailable {
            message: self
                .store
                .last_error()
                .unwrap_or_else(|| "store reported not ready".to_string()),
        })
    }

    fn definition_path(&self) -> String {
        format!("EntityDefinitions(LogicalName='{}')", self.schema.table)
    }

    pub async fn table_exists(&self) -> Result<bool> {
        self.ensure_ready()?;

        let response = self
            .store
            .request(Method::GET, &self.definition_path())
            .query(&[("$select", "LogicalName")])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(response, "table lookup").await?;
        Ok(true)
    }

    pub async fn ensure_table(&self) -> Result<ProvisionOutcome> {
        if self.table_exists().await? {
            tracing::info!("✅ Table {} already exists", self.schema.table);
            return Ok(ProvisionOutcome::AlreadyExists);
        }

        tracing::info!("🛠️ Creating table {}", self.schema.table);
        self.post("EntityDefinitions", &entity_definition(self.schema), "table creation")
            .await?;

        let attributes_path = format!("{}/Attributes", self.definition_path());
        self.post(
            &attributes_path,
            &date_attribute(&self.schema.start_field, "Start Date", "The start date"),
            "start column creation",
        )
        .await?;
        self.post(
            &attributes_path,
            &date_attribute(&self.schema.end_field, "End Date", "The end date"),
            "end column creation",
        )
        .await?;

        tracing::info!("✅ Table {} created with its date columns", self.schema.table);
        Ok(ProvisionOutcome::Created)
    }

    async fn post(&self, path: &str, body: &Value, operation: &str) -> Result<()> {
        let response = self
            .store
            .request(Method::POST, path)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(body)
            .send()
            .await?;
        check_status(response, operation).await?;
        Ok(())
    }
}

fn label(text: &str) -> Value {
    json!({
        "@odata.type": "Microsoft.Dynamics.CRM.Label",
        "LocalizedLabels": [{
            "@odata.type": "Microsoft.Dynamics.CRM.LocalizedLabel",
            "Label": text,
            "LanguageCode": LANGUAGE_CODE
        }]
    })
}

fn required_level(level: &str) -> Value {
    json!({
        "Value": level,
        "CanBeChanged": true,
        "ManagedPropertyLogicalName": "canmodifyrequirementlevelsettings"
    })
}

pub(crate) fn entity_definition(schema: &TableSchema) -> Value {
    json!({
        "@odata.type": "Microsoft.Dynamics.CRM.EntityMetadata",
        "SchemaName": schema.table,
        "DisplayName": label("Time Entry"),
        "DisplayCollectionName": label("Time Entries"),
        "Description": label("An entity to store information about time entries"),
        "OwnershipType": "UserOwned",
        "IsActivity": false,
        "HasActivities": false,
        "HasNotes": false,
        "Attributes": [{
            "@odata.type": "Microsoft.Dynamics.CRM.StringAttributeMetadata",
            "AttributeType": "String",
            "AttributeTypeName": { "Value": "StringType" },
            "SchemaName": schema.title_field,
            "IsPrimaryName": true,
            "RequiredLevel": required_level("None"),
            "MaxLength": TITLE_MAX_LENGTH,
            "FormatName": { "Value": "Text" },
            "DisplayName": label("Title"),
            "Description": label("The primary attribute for the entity.")
        }]
    })
}

pub(crate) fn date_attribute(schema_name: &str, display_name: &str, description: &str) -> Value {
    json!({
        "@odata.type": "Microsoft.Dynamics.CRM.DateTimeAttributeMetadata",
        "AttributeType": "DateTime",
        "AttributeTypeName": { "Value": "DateTimeType" },
        "SchemaName": schema_name,
        "RequiredLevel": required_level("ApplicationRequired"),
        "Format": "DateOnly",
        "DateTimeBehavior": { "Value": "DateOnly" },
        "DisplayName": label(display_name),
        "Description": label(description)
    })
}
