use crate::core::payload::parse_payload;
use crate::core::reconciler::RangeReconciler;
use crate::domain::model::TableSchema;
use crate::domain::ports::StoreConnector;
use crate::utils::error::TimeEntryError;
use serde::Serialize;

pub const INVALID_PAYLOAD_MESSAGE: &str = "payload is not valid";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionResponse {
    pub status: u16,
    pub body: String,
}

impl FunctionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: message.into(),
        }
    }

    pub fn bad_request() -> Self {
        Self {
            status: 400,
            body: INVALID_PAYLOAD_MESSAGE.to_string(),
        }
    }

    pub fn service_unavailable() -> Self {
        Self {
            status: 503,
            body: String::new(),
        }
    }

    /// Payload problems become 400, everything else 503. Details stay in the logs.
    pub fn from_error(err: &TimeEntryError) -> Self {
        if err.is_payload_error() {
            Self::bad_request()
        } else {
            Self::service_unavailable()
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One call to [`TimeEntryFunction::run`] is one reconciliation pass.
pub struct TimeEntryFunction<C: StoreConnector> {
    connector: C,
    schema: TableSchema,
}

impl<C: StoreConnector> TimeEntryFunction<C> {
    pub fn new(connector: C, schema: TableSchema) -> Self {
        Self { connector, schema }
    }

    pub async fn run(&self, body: &str) -> FunctionResponse {
        tracing::debug!("📥 Received payload ({} bytes)", body.len());

        let request = match parse_payload(body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("🚫 Rejected payload: {}", e);
                return FunctionResponse::from_error(&e);
            }
        };

        tracing::info!(
            "📅 Validated range {} .. {} ({} day(s))",
            request.start_on(),
            request.end_on(),
            request.day_count()
        );

        let store = self.connector.connect().await;
        let reconciler = RangeReconciler::new(store, self.schema.clone());

        match reconciler.reconcile(&request).await {
            Ok(outcome) => FunctionResponse::ok(outcome.message()),
            Err(e) => {
                tracing::error!(
                    "❌ Reconciliation failed: {} (Category: {:?}, Severity: {:?})",
                    e,
                    e.category(),
                    e.severity()
                );
                FunctionResponse::from_error(&e)
            }
        }
    }
}
