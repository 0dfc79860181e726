//! REST API統合テスト（インメモリリポジトリ使用）
//!
//! tower::ServiceExt + oneshot でルーターを直接呼び出す。

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use k1s0_contact_import_server::domain::repository::ImportJobRepository;
use k1s0_contact_import_server::domain::value_object::ImportStatus;
use k1s0_contact_import_server::infrastructure::config::ImportConfig;
use k1s0_contact_import_server::test_support::{make_test_app, make_test_app_with, TestApp};

const TENANT: &str = "tenant-a";

const E2E_FILE: &str = "Nome,phone,Valor\nAna,11988887777,50\nBruno,not-a-phone,10\nAna,11988887777,70\n";

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn preview(app: &Router, content: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/contact-imports/preview")
            .header("x-tenant-id", TENANT)
            .header("content-type", "text/csv")
            .body(Body::from(content.to_string()))
            .unwrap(),
    )
    .await
}

async fn start_import(app: &Router, body: &Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/contact-imports")
            .header("x-tenant-id", TENANT)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
    )
    .await
}

async fn get_job(app: &Router, job_id: &str) -> (StatusCode, Value) {
    get_job_as(app, TENANT, job_id).await
}

async fn get_job_as(app: &Router, tenant: &str, job_id: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .uri(format!("/api/v1/contact-imports/{job_id}"))
            .header("x-tenant-id", tenant)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

async fn cancel_job(app: &Router, job_id: &str) -> (StatusCode, Value) {
    cancel_job_as(app, TENANT, job_id).await
}

async fn cancel_job_as(app: &Router, tenant: &str, job_id: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/contact-imports/{job_id}/cancel"))
            .header("x-tenant-id", tenant)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

/// ジョブが終端状態になるまでポーリングし、最後のスナップショットを返す。
async fn wait_for_terminal(app: &Router, job_id: &str) -> Value {
    let mut job = Value::Null;
    for _ in 0..200 {
        let (_, snapshot) = get_job(app, job_id).await;
        job = snapshot;
        if is_terminal(&job) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    job
}

/// プレビュー結果の区切り文字とマッピングでフル実行する。
async fn preview_then_import(app: &Router, content: &str, update_existing: bool) -> (StatusCode, Value) {
    let (status, preview) = preview(app, content).await;
    assert_eq!(status, StatusCode::OK);
    let body = json!({
        "file_name": "contacts.csv",
        "content": content,
        "delimiter": preview["delimiter"],
        "column_mapping": preview["column_mapping"],
        "update_existing": update_existing,
    });
    start_import(app, &body).await
}

fn numbered_file(rows: usize) -> String {
    let mut content = String::from("nome;celular\n");
    for i in 0..rows {
        content.push_str(&format!("Contato {i};119{i:08}\n"));
    }
    content
}

fn assert_counter_identity(job: &Value) {
    let processed = job["processed_rows"].as_i64().unwrap();
    let sum = job["created_count"].as_i64().unwrap()
        + job["updated_count"].as_i64().unwrap()
        + job["skipped_count"].as_i64().unwrap()
        + job["error_count"].as_i64().unwrap();
    assert_eq!(processed, sum);
}

fn is_terminal(job: &Value) -> bool {
    matches!(
        job["status"].as_str(),
        Some("completed" | "failed" | "cancelled")
    )
}

// ---------------------------------------------------------------------------
// Health / Readiness
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_healthz_and_readyz_return_ok() {
    let TestApp { router, .. } = make_test_app();
    for uri in ["/healthz", "/readyz"] {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_preview_detects_format_and_mapping() {
    let TestApp { router, contacts, .. } = make_test_app();

    let (status, body) = preview(&router, E2E_FILE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delimiter"], "comma");
    assert_eq!(body["estimated_total_rows"], 3);
    assert_eq!(body["column_mapping"][0]["target"], json!({"kind": "field", "field": "name"}));
    assert_eq!(body["column_mapping"][1]["target"], json!({"kind": "field", "field": "phone"}));
    assert_eq!(body["column_mapping"][2]["target"], json!({"kind": "custom"}));
    assert_eq!(body["sample_rows"][0]["record"]["phone_key"], "5511988887777");
    assert!(body["sample_rows"][1]["error"].is_string());

    // プレビューはストアに触れない
    assert!(contacts.list(TENANT).await.is_empty());
}

#[tokio::test]
async fn test_preview_requires_tenant_header() {
    let TestApp { router, .. } = make_test_app();
    let (status, body) = send(
        &router,
        Request::builder()
            .method("POST")
            .uri("/api/v1/contact-imports/preview")
            .body(Body::from(E2E_FILE))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "SYS_CIMPORT_VALIDATION_ERROR");
}

#[tokio::test]
async fn test_preview_rejects_empty_file() {
    let TestApp { router, .. } = make_test_app();
    let (status, body) = preview(&router, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "SYS_CIMPORT_INVALID_FILE");
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_end_to_end_import_scenario() {
    let TestApp { router, contacts, .. } = make_test_app();

    let (status, job) = preview_then_import(&router, E2E_FILE, true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "completed");
    assert_eq!(job["total_rows"], 3);
    assert_eq!(job["created_count"], 1);
    assert_eq!(job["updated_count"], 1);
    assert_eq!(job["error_count"], 1);
    assert_eq!(job["skipped_count"], 0);
    assert_eq!(job["errors"][0]["row"], 2);
    assert_counter_identity(&job);

    let stored = contacts.list(TENANT).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].data.fields.name.as_deref(), Some("Ana"));
    assert_eq!(stored[0].data.custom_fields["Valor"], "70");
}

#[tokio::test]
async fn test_import_is_idempotent_without_update() {
    let TestApp { router, contacts, .. } = make_test_app();
    let content = "nome;celular\nAna;11988887777\nBia;(11) 97777-6666\nCaio;+55 11 96666-5555\n";

    let (status, first) = preview_then_import(&router, content, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["created_count"], 3);

    let (status, second) = preview_then_import(&router, content, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["created_count"], 0);
    assert_eq!(second["skipped_count"], 3);
    assert_eq!(contacts.list(TENANT).await.len(), 3);
}

#[tokio::test]
async fn test_equivalent_phone_spellings_share_one_contact() {
    let TestApp { router, contacts, .. } = make_test_app();
    let content = "nome,telefone\nAna,11988887777\nAna,(11) 98888-7777\nAna,+55 11 98888 7777\n";

    let (status, job) = preview_then_import(&router, content, true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["created_count"], 1);
    assert_eq!(job["updated_count"], 2);
    assert_eq!(contacts.list(TENANT).await.len(), 1);
}

#[tokio::test]
async fn test_merge_keeps_existing_city_when_incoming_is_empty() {
    let TestApp { router, contacts, .. } = make_test_app();

    let (status, _) =
        preview_then_import(&router, "nome,telefone,cidade\nAna,11988887777,Recife\n", true).await;
    assert_eq!(status, StatusCode::OK);

    let (status, job) =
        preview_then_import(&router, "nome,telefone,cidade\nAna Maria,11988887777,\n", true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["updated_count"], 1);

    let stored = contacts.list(TENANT).await;
    assert_eq!(stored[0].data.fields.city.as_deref(), Some("Recife"));
    assert_eq!(stored[0].data.fields.name.as_deref(), Some("Ana Maria"));
}

#[tokio::test]
async fn test_blank_leading_record_is_not_taken_as_header() {
    let TestApp { router, contacts, .. } = make_test_app();
    let content = ",,\nNome,phone,Valor\nAna,11988887777,50\n";

    let (status, preview_body) = preview(&router, content).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview_body["estimated_total_rows"], 1);

    let (status, job) = preview_then_import(&router, content, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "completed");
    assert_eq!(job["total_rows"], 1);
    assert_eq!(job["created_count"], 1);
    assert_counter_identity(&job);
    assert_eq!(contacts.list(TENANT).await.len(), 1);
}

#[tokio::test]
async fn test_split_phone_columns_accept_full_numbers() {
    let TestApp { router, contacts, .. } = make_test_app();
    let content = "Nome;DDD;Telefone\nAna;11;98888-7777\nBia;21;21977776666\nCaio;31;+55 31 96666-5555\n";

    let (status, preview_body) = preview(&router, content).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview_body["split_phone"], true);

    let (status, job) = preview_then_import(&router, content, false).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["created_count"], 3);
    assert_eq!(job["error_count"], 0);

    let mut keys: Vec<String> = contacts
        .list(TENANT)
        .await
        .into_iter()
        .map(|c| c.data.phone_key.as_str().to_string())
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["5511988887777", "5521977776666", "5531966665555"]);
}

#[tokio::test]
async fn test_import_rejects_mismatched_mapping() {
    let TestApp { router, .. } = make_test_app();
    let body = json!({
        "file_name": "contacts.csv",
        "content": "Nome,phone\nAna,11988887777\n",
        "delimiter": "comma",
        "column_mapping": [
            {"header": "Nome", "target": {"kind": "field", "field": "name"}},
            {"header": "phone", "target": {"kind": "custom"}}
        ],
    });

    let (status, body) = start_import(&router, &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "SYS_CIMPORT_VALIDATION_ERROR");
}

#[tokio::test]
async fn test_import_rejects_file_over_size_limit() {
    let config = ImportConfig {
        max_file_size_mb: 0,
        ..ImportConfig::default()
    };
    let TestApp { router, .. } = make_test_app_with(config, None);
    let body = json!({
        "file_name": "contacts.csv",
        "content": "Nome,phone\nAna,11988887777\n",
        "delimiter": "comma",
        "column_mapping": [
            {"header": "Nome", "target": {"kind": "field", "field": "name"}},
            {"header": "phone", "target": {"kind": "field", "field": "phone"}}
        ],
    });

    let (status, body) = start_import(&router, &body).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "SYS_CIMPORT_FILE_TOO_LARGE");
}

// ---------------------------------------------------------------------------
// Job status / cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_large_import_is_accepted_and_polled_monotonically() {
    let config = ImportConfig {
        sync_row_limit: 5,
        batch_size: 2,
        ..ImportConfig::default()
    };
    let TestApp { router, contacts, .. } =
        make_test_app_with(config, Some(Duration::from_millis(5)));
    let content = numbered_file(30);

    let (status, accepted) = preview_then_import(&router, &content, false).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = accepted["job_id"].as_str().unwrap().to_string();

    let mut last_processed = 0;
    let mut job = Value::Null;
    for _ in 0..500 {
        let (status, snapshot) = get_job(&router, &job_id).await;
        assert_eq!(status, StatusCode::OK);
        let processed = snapshot["processed_rows"].as_i64().unwrap();
        assert!(processed >= last_processed);
        assert_counter_identity(&snapshot);
        last_processed = processed;
        job = snapshot;
        if is_terminal(&job) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(job["status"], "completed");
    assert_eq!(job["processed_rows"], 30);
    assert_eq!(job["created_count"], 30);
    assert_eq!(contacts.list(TENANT).await.len(), 30);
}

#[tokio::test]
async fn test_cancel_running_import() {
    let config = ImportConfig {
        sync_row_limit: 5,
        batch_size: 1,
        ..ImportConfig::default()
    };
    let TestApp { router, .. } = make_test_app_with(config, Some(Duration::from_millis(20)));
    let content = numbered_file(200);

    let (status, accepted) = preview_then_import(&router, &content, false).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = accepted["job_id"].as_str().unwrap().to_string();

    // 実行中になり、数行処理されるまで待つ
    for _ in 0..200 {
        let (_, snapshot) = get_job(&router, &job_id).await;
        if snapshot["status"] == "processing" && snapshot["processed_rows"].as_i64().unwrap() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (status, _) = cancel_job(&router, &job_id).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let job = wait_for_terminal(&router, &job_id).await;
    assert_eq!(job["status"], "cancelled");
    assert!(job["processed_rows"].as_i64().unwrap() < job["total_rows"].as_i64().unwrap());
    assert!(job["completed_at"].is_string());
    assert_counter_identity(&job);

    // 終端状態のジョブはキャンセルできない
    let (status, body) = cancel_job(&router, &job_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "SYS_CIMPORT_CONFLICT");
}

#[tokio::test]
async fn test_cancel_import_waiting_for_slot() {
    let config = ImportConfig {
        sync_row_limit: 5,
        batch_size: 1,
        max_concurrent_jobs_per_tenant: 1,
        ..ImportConfig::default()
    };
    let TestApp { router, .. } = make_test_app_with(config, Some(Duration::from_millis(20)));

    let (status, running) = preview_then_import(&router, &numbered_file(200), false).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let running_id = running["job_id"].as_str().unwrap().to_string();
    for _ in 0..200 {
        let (_, snapshot) = get_job(&router, &running_id).await;
        if snapshot["status"] == "processing" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (status, queued) = preview_then_import(&router, &numbered_file(10), false).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let queued_id = queued["job_id"].as_str().unwrap().to_string();
    let (_, snapshot) = get_job(&router, &queued_id).await;
    assert_eq!(snapshot["status"], "pending");

    let (status, _) = cancel_job(&router, &queued_id).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // 先行ジョブの終了を待たずに cancelled になる
    let job = wait_for_terminal(&router, &queued_id).await;
    assert_eq!(job["status"], "cancelled");
    assert_eq!(job["processed_rows"], 0);
    assert!(job["completed_at"].is_string());

    let (_, snapshot) = get_job(&router, &running_id).await;
    assert_eq!(snapshot["status"], "processing");
    let (status, _) = cancel_job(&router, &running_id).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_job_is_invisible_to_other_tenants() {
    let TestApp { router, .. } = make_test_app();
    let (status, job) = preview_then_import(&router, E2E_FILE, true).await;
    assert_eq!(status, StatusCode::OK);
    let job_id = job["id"].as_str().unwrap();

    let (status, body) = get_job_as(&router, "tenant-b", job_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "SYS_CIMPORT_NOT_FOUND");

    let (status, _) = cancel_job_as(&router, "tenant-b", job_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, snapshot) = get_job(&router, job_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["status"], "completed");
}

#[tokio::test]
async fn test_running_job_cannot_be_cancelled_by_other_tenant() {
    let config = ImportConfig {
        sync_row_limit: 5,
        batch_size: 1,
        ..ImportConfig::default()
    };
    let TestApp { router, .. } = make_test_app_with(config, Some(Duration::from_millis(5)));

    let (status, accepted) = preview_then_import(&router, &numbered_file(20), false).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = accepted["job_id"].as_str().unwrap().to_string();

    let (status, _) = cancel_job_as(&router, "tenant-b", &job_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let job = wait_for_terminal(&router, &job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["created_count"], 20);
}

#[tokio::test]
async fn test_job_status_requires_tenant_header() {
    let TestApp { router, .. } = make_test_app();
    let (status, body) = send(
        &router,
        Request::builder()
            .uri(format!("/api/v1/contact-imports/{}", uuid::Uuid::new_v4()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "SYS_CIMPORT_VALIDATION_ERROR");
}

#[tokio::test]
async fn test_cancel_completed_job_conflicts() {
    let TestApp { router, jobs, .. } = make_test_app();
    let (status, job) = preview_then_import(&router, E2E_FILE, true).await;
    assert_eq!(status, StatusCode::OK);

    let job_id = job["id"].as_str().unwrap();
    let (status, _) = cancel_job(&router, job_id).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, snapshot) = get_job(&router, job_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["status"], "completed");

    let stored = jobs
        .find_by_id(uuid::Uuid::parse_str(job_id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ImportStatus::Completed);
    assert!(stored.counters_consistent());
}

#[tokio::test]
async fn test_unknown_job_returns_not_found() {
    let TestApp { router, .. } = make_test_app();
    let job_id = uuid::Uuid::new_v4().to_string();

    let (status, body) = get_job(&router, &job_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "SYS_CIMPORT_NOT_FOUND");

    let (status, _) = cancel_job(&router, &job_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_job_id_returns_bad_request() {
    let TestApp { router, .. } = make_test_app();
    let (status, body) = get_job(&router, "not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "SYS_CIMPORT_VALIDATION_ERROR");
}
