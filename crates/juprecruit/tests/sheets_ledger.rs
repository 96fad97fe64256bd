//! Google Sheets ledger behavior against a mock Sheets API.

use std::sync::Arc;

use async_trait::async_trait;
use httpmock::prelude::*;
use serde_json::json;

use juprecruit::config::SheetTarget;
use juprecruit::integrations::{AccessTokenSource, GoogleSheetsLedger};
use juprecruit::recruitment::{LedgerError, LedgerRow, SubmissionLedger};

struct StaticToken;

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, LedgerError> {
        Ok("test-token".to_string())
    }
}

fn ledger(server: &MockServer) -> GoogleSheetsLedger {
    GoogleSheetsLedger::new(
        Arc::new(StaticToken),
        SheetTarget {
            spreadsheet_id: "talent-sheet".to_string(),
            title: "Sheet1".to_string(),
        },
        SheetTarget {
            spreadsheet_id: "jobs-sheet".to_string(),
            title: "JobSheet".to_string(),
        },
    )
    .expect("ledger builds")
    .with_base_url(server.base_url())
}

fn row(cells: &[&str]) -> LedgerRow {
    LedgerRow(cells.iter().map(|cell| cell.to_string()).collect())
}

#[tokio::test]
async fn talent_append_skips_header_write_when_present() {
    let server = MockServer::start_async().await;
    let headers: Vec<&str> = juprecruit::recruitment::TALENT_HEADERS.to_vec();
    let read_headers = server
        .mock_async(|when, then| {
            when.method(GET)
                .path_contains("/talent-sheet/values/")
                .header("authorization", "Bearer test-token");
            then.status(200).json_body(json!({
                "range": "Sheet1!A1:M1",
                "majorDimension": "ROWS",
                "values": [headers],
            }));
        })
        .await;
    let write_headers = server
        .mock_async(|when, then| {
            when.method(PUT).path_contains("/talent-sheet/values/");
            then.status(200).json_body(json!({}));
        })
        .await;
    let append = server
        .mock_async(|when, then| {
            when.method(POST)
                .path_contains("/talent-sheet/values/Sheet1:append")
                .query_param("valueInputOption", "USER_ENTERED")
                .json_body(json!({ "values": [["Ada", "Compilers"]] }));
            then.status(200).json_body(json!({
                "updates": { "updatedRange": "Sheet1!A7:M7", "updatedRows": 1 }
            }));
        })
        .await;

    let outcome = ledger(&server)
        .append_talent(row(&["Ada", "Compilers"]))
        .await
        .expect("append succeeds");

    read_headers.assert_async().await;
    append.assert_async().await;
    assert_eq!(write_headers.hits_async().await, 0);
    assert_eq!(outcome.updated_range, "Sheet1!A7:M7");
}

#[tokio::test]
async fn short_header_row_is_rewritten_raw() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/talent-sheet/values/");
            then.status(200)
                .json_body(json!({ "range": "Sheet1!A1:M1", "values": [["Name", "Expertise"]] }));
        })
        .await;
    let write_headers = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path_contains("/talent-sheet/values/")
                .query_param("valueInputOption", "RAW")
                .body_contains("Previous Work Links");
            then.status(200).json_body(json!({ "updatedCells": 13 }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path_contains(":append");
            then.status(200)
                .json_body(json!({ "updates": { "updatedRange": "Sheet1!A2:M2" } }));
        })
        .await;

    ledger(&server)
        .append_talent(row(&["Ada"]))
        .await
        .expect("append succeeds");

    write_headers.assert_async().await;
}

#[tokio::test]
async fn job_ledger_adds_missing_sheet_before_appending() {
    let server = MockServer::start_async().await;
    let properties = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/jobs-sheet")
                .query_param("fields", "sheets.properties");
            then.status(200).json_body(json!({
                "sheets": [{ "properties": { "sheetId": 0, "title": "Sheet1" } }]
            }));
        })
        .await;
    let add_sheet = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/jobs-sheet:batchUpdate")
                .json_body(json!({
                    "requests": [{ "addSheet": { "properties": { "title": "JobSheet" } } }]
                }));
            then.status(200).json_body(json!({ "replies": [{}] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/jobs-sheet/values/");
            then.status(200).json_body(json!({ "range": "JobSheet!A1:H1" }));
        })
        .await;
    let write_headers = server
        .mock_async(|when, then| {
            when.method(PUT).path_contains("/jobs-sheet/values/");
            then.status(200).json_body(json!({}));
        })
        .await;
    let append = server
        .mock_async(|when, then| {
            when.method(POST).path_contains("/jobs-sheet/values/JobSheet:append");
            then.status(200)
                .json_body(json!({ "updates": { "updatedRange": "JobSheet!A2:H2" } }));
        })
        .await;

    let outcome = ledger(&server)
        .append_job_application(row(&["Grace", "grace@example.com"]))
        .await
        .expect("append succeeds");

    properties.assert_async().await;
    add_sheet.assert_async().await;
    write_headers.assert_async().await;
    append.assert_async().await;
    assert_eq!(outcome.updated_range, "JobSheet!A2:H2");
}

#[tokio::test]
async fn quota_exhaustion_maps_to_rate_limited() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/talent-sheet/values/");
            then.status(429).json_body(json!({
                "error": { "code": 429, "status": "RESOURCE_EXHAUSTED" }
            }));
        })
        .await;

    match ledger(&server).append_talent(row(&["Ada"])).await {
        Err(LedgerError::RateLimited) => {}
        other => panic!("expected rate limit, got {other:?}"),
    }
}
