use anyhow::Result;
use chrono::NaiveDate;
use httpmock::prelude::*;
use serde_json::json;
use time_entry_manager::domain::model::NewTimeEntry;
use time_entry_manager::domain::ports::{RecordStore, StoreConnector};
use time_entry_manager::{
    DataverseConnector, ProvisionOutcome, TableProvisioner, TableSchema, TimeEntryFunction,
};

const API: &str = "/api/data/v9.2";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn connector(server: &MockServer) -> DataverseConnector {
    DataverseConnector::from_connection_str(&format!(
        "Url={};AuthType=Token;Token=test-token",
        server.base_url()
    ))
    .unwrap()
}

fn who_am_i(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/WhoAmI", API))
            .header("Authorization", "Bearer test-token");
        then.status(200).json_body(json!({
            "BusinessUnitId": "b1a2c3d4-0000-0000-0000-000000000001",
            "UserId": "b1a2c3d4-0000-0000-0000-000000000002",
            "OrganizationId": "b1a2c3d4-0000-0000-0000-000000000003"
        }));
    })
}

#[tokio::test]
async fn test_connect_probes_who_am_i() -> Result<()> {
    let server = MockServer::start();
    let probe = who_am_i(&server);

    let store = connector(&server).connect().await;

    probe.assert();
    assert!(store.is_ready());
    assert_eq!(store.last_error(), None);
    Ok(())
}

#[tokio::test]
async fn test_failed_probe_yields_not_ready_store() -> Result<()> {
    let server = MockServer::start();
    let probe = server.mock(|when, then| {
        when.method(GET).path(format!("{}/WhoAmI", API));
        then.status(401).body("token expired");
    });

    let store = connector(&server).connect().await;

    probe.assert();
    assert!(!store.is_ready());
    let diagnostic = store.last_error().unwrap();
    assert!(diagnostic.contains("401"));
    assert!(diagnostic.contains("token expired"));
    Ok(())
}

#[tokio::test]
async fn test_oauth_password_grant_token_is_used() -> Result<()> {
    let server = MockServer::start();
    let token_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/oauth2/token")
            .x_www_form_urlencoded_tuple("grant_type", "password")
            .x_www_form_urlencoded_tuple("username", "jane@contoso.onmicrosoft.com")
            .x_www_form_urlencoded_tuple("password", "pass");
        then.status(200).json_body(json!({
            "token_type": "Bearer",
            "access_token": "issued-token",
            "expires_in": "3599"
        }));
    });
    let probe = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/WhoAmI", API))
            .header("Authorization", "Bearer issued-token");
        then.status(200).json_body(json!({}));
    });

    let connector = DataverseConnector::from_connection_str(&format!(
        "AuthType=OAuth;Username=jane@contoso.onmicrosoft.com;Password=pass;Url={};Authority={}",
        server.base_url(),
        server.url("/oauth2/token")
    ))?;
    let store = connector.connect().await;

    token_mock.assert();
    probe.assert();
    assert!(store.is_ready());
    Ok(())
}

#[tokio::test]
async fn test_find_by_date_filters_on_start_column() -> Result<()> {
    let server = MockServer::start();
    who_am_i(&server);
    let lookup = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/kk_timeentries", API))
            .query_param("$select", "kk_timeentryid")
            .query_param("$filter", "kk_start eq 2022-01-03");
        then.status(200).json_body(json!({
            "@odata.context": "https://org.crm.dynamics.com/api/data/v9.2/$metadata#kk_timeentries(kk_timeentryid)",
            "value": [
                { "kk_timeentryid": "11111111-1111-1111-1111-111111111111" },
                { "kk_timeentryid": "22222222-2222-2222-2222-222222222222" }
            ]
        }));
    });

    let store = connector(&server).connect().await;
    let ids = store
        .find_by_date(&TableSchema::default(), date(2022, 1, 3))
        .await?;

    lookup.assert();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0].as_str(), "11111111-1111-1111-1111-111111111111");
    Ok(())
}

#[tokio::test]
async fn test_find_by_date_rejects_rows_without_id() -> Result<()> {
    let server = MockServer::start();
    who_am_i(&server);
    server.mock(|when, then| {
        when.method(GET).path(format!("{}/kk_timeentries", API));
        then.status(200)
            .json_body(json!({ "value": [{ "kk_timeentryid": null, "kk_title": "2022-01-03" }] }));
    });

    let store = connector(&server).connect().await;
    let result = store
        .find_by_date(&TableSchema::default(), date(2022, 1, 3))
        .await;

    assert!(matches!(
        result,
        Err(time_entry_manager::TimeEntryError::StoreResponse { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_row_without_id_does_not_cause_duplicate_insert() -> Result<()> {
    let server = MockServer::start();
    who_am_i(&server);
    server.mock(|when, then| {
        when.method(GET).path(format!("{}/kk_timeentries", API));
        then.status(200)
            .json_body(json!({ "value": [{ "kk_timeentryid": null, "kk_title": "2022-01-03" }] }));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path(format!("{}/kk_timeentries", API));
        then.status(204);
    });

    let function = TimeEntryFunction::new(connector(&server), TableSchema::default());
    let response = function
        .run(r#"{"StartOn": "2022-01-03", "EndOn": "2022-01-03"}"#)
        .await;

    assert_eq!(response.status, 503);
    create.assert_hits(0);
    Ok(())
}

#[tokio::test]
async fn test_insert_reads_id_from_entity_id_header() -> Result<()> {
    let server = MockServer::start();
    who_am_i(&server);
    let create = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/kk_timeentries", API))
            .json_body(json!({
                "kk_title": "2022-01-03",
                "kk_start": "2022-01-03",
                "kk_end": "2022-01-03"
            }));
        then.status(204).header(
            "OData-EntityId",
            "https://org.crm.dynamics.com/api/data/v9.2/kk_timeentries(33333333-3333-3333-3333-333333333333)",
        );
    });

    let store = connector(&server).connect().await;
    let id = store
        .insert(&TableSchema::default(), &NewTimeEntry::for_day(date(2022, 1, 3)))
        .await?;

    create.assert();
    assert_eq!(id.as_str(), "33333333-3333-3333-3333-333333333333");
    Ok(())
}

#[tokio::test]
async fn test_insert_falls_back_to_returned_row() -> Result<()> {
    let server = MockServer::start();
    who_am_i(&server);
    server.mock(|when, then| {
        when.method(POST).path(format!("{}/kk_timeentries", API));
        then.status(201).json_body(json!({
            "kk_timeentryid": "44444444-4444-4444-4444-444444444444",
            "kk_title": "2022-01-04"
        }));
    });

    let store = connector(&server).connect().await;
    let id = store
        .insert(&TableSchema::default(), &NewTimeEntry::for_day(date(2022, 1, 4)))
        .await?;

    assert_eq!(id.as_str(), "44444444-4444-4444-4444-444444444444");
    Ok(())
}

#[tokio::test]
async fn test_function_end_to_end_against_web_api() -> Result<()> {
    let server = MockServer::start();
    who_am_i(&server);

    // 2022-01-04 已存在，其餘兩天需要新增
    let existing = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/kk_timeentries", API))
            .query_param("$filter", "kk_start eq 2022-01-04");
        then.status(200)
            .json_body(json!({ "value": [{ "kk_timeentryid": "55555555-5555-5555-5555-555555555555" }] }));
    });
    let missing_first = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/kk_timeentries", API))
            .query_param("$filter", "kk_start eq 2022-01-03");
        then.status(200).json_body(json!({ "value": [] }));
    });
    let missing_last = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/kk_timeentries", API))
            .query_param("$filter", "kk_start eq 2022-01-05");
        then.status(200).json_body(json!({ "value": [] }));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path(format!("{}/kk_timeentries", API));
        then.status(204).header(
            "OData-EntityId",
            "https://org.crm.dynamics.com/api/data/v9.2/kk_timeentries(66666666-6666-6666-6666-666666666666)",
        );
    });

    let function = TimeEntryFunction::new(connector(&server), TableSchema::default());
    let response = function
        .run(r#"{"StartOn": "2022-01-03", "EndOn": "2022-01-05"}"#)
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "2 time entries inserted.");
    existing.assert();
    missing_first.assert();
    missing_last.assert();
    create.assert_hits(2);
    Ok(())
}

#[tokio::test]
async fn test_function_returns_503_when_lookup_fails() -> Result<()> {
    let server = MockServer::start();
    who_am_i(&server);
    server.mock(|when, then| {
        when.method(GET).path(format!("{}/kk_timeentries", API));
        then.status(500).body("internal error");
    });
    let create = server.mock(|when, then| {
        when.method(POST).path(format!("{}/kk_timeentries", API));
        then.status(204);
    });

    let function = TimeEntryFunction::new(connector(&server), TableSchema::default());
    let response = function
        .run(r#"{"StartOn": "2022-01-03", "EndOn": "2022-01-05"}"#)
        .await;

    assert_eq!(response.status, 503);
    assert!(response.body.is_empty());
    create.assert_hits(0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_payload_never_reaches_the_store() -> Result<()> {
    let server = MockServer::start();
    let probe = who_am_i(&server);

    let function = TimeEntryFunction::new(connector(&server), TableSchema::default());
    let response = function.run("Some not-json data!").await;

    assert_eq!(response.status, 400);
    probe.assert_hits(0);
    Ok(())
}

#[tokio::test]
async fn test_provisioning_skips_existing_table() -> Result<()> {
    let server = MockServer::start();
    who_am_i(&server);
    let lookup = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/EntityDefinitions(LogicalName='kk_timeentry')", API));
        then.status(200).json_body(json!({ "LogicalName": "kk_timeentry" }));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path(format!("{}/EntityDefinitions", API));
        then.status(204);
    });

    let store = connector(&server).connect_ready().await?;
    let schema = TableSchema::default();
    let outcome = TableProvisioner::new(&store, &schema).ensure_table().await?;

    assert_eq!(outcome, ProvisionOutcome::AlreadyExists);
    lookup.assert();
    create.assert_hits(0);
    Ok(())
}

#[tokio::test]
async fn test_provisioning_creates_table_and_date_columns() -> Result<()> {
    let server = MockServer::start();
    who_am_i(&server);
    let lookup = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/EntityDefinitions(LogicalName='kk_timeentry')", API));
        then.status(404).json_body(json!({
            "error": { "code": "0x80060888", "message": "Could not find entity" }
        }));
    });
    let create_table = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/EntityDefinitions", API))
            .body_contains("\"SchemaName\":\"kk_timeentry\"")
            .body_contains("\"SchemaName\":\"kk_title\"");
        then.status(204);
    });
    let create_start = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/EntityDefinitions(LogicalName='kk_timeentry')/Attributes", API))
            .body_contains("\"SchemaName\":\"kk_start\"");
        then.status(204);
    });
    let create_end = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/EntityDefinitions(LogicalName='kk_timeentry')/Attributes", API))
            .body_contains("\"SchemaName\":\"kk_end\"");
        then.status(204);
    });

    let store = connector(&server).connect_ready().await?;
    let schema = TableSchema::default();
    let outcome = TableProvisioner::new(&store, &schema).ensure_table().await?;

    assert_eq!(outcome, ProvisionOutcome::Created);
    lookup.assert();
    create_table.assert();
    create_start.assert();
    create_end.assert();
    Ok(())
}

#[tokio::test]
async fn test_connect_ready_reports_unavailable_store() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("{}/WhoAmI", API));
        then.status(503);
    });

    let result = connector(&server).connect_ready().await;
    assert!(matches!(
        result,
        Err(time_entry_manager::TimeEntryError::StoreUnavailable { .. })
    ));
    Ok(())
}
