use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ImportError;
use super::AppState;
use crate::domain::entity::{ColumnMapping, ImportJob};
use crate::domain::service::ImportOptions;
use crate::domain::value_object::Delimiter;
use crate::usecase::{PreviewResult, StartImportInput, StartImportOutcome};

/// テナントIDを運ぶヘッダー。
pub const TENANT_HEADER: &str = "x-tenant-id";

// --- Request / Response DTOs ---

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct StartImportRequest {
    pub file_name: String,
    /// ファイル本文（プレーンテキスト）。
    pub content: String,
    pub delimiter: Delimiter,
    #[schema(value_type = Vec<crate::domain::entity::ColumnAssignment>)]
    pub column_mapping: ColumnMapping,
    #[serde(default)]
    pub update_existing: bool,
    #[serde(default)]
    pub all_have_consent: bool,
    pub consent_source: Option<String>,
    pub consent_date: Option<NaiveDate>,
    pub auto_tag_id: Option<Uuid>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AcceptedImportResponse {
    pub job_id: String,
    pub status: String,
}

// --- Handlers ---

#[utoipa::path(get, path = "/healthz", responses((status = 200, description = "Health check OK")))]
pub async fn healthz() -> &'static str {
    "ok"
}

#[utoipa::path(get, path = "/readyz", responses((status = 200, description = "Ready")))]
pub async fn readyz() -> &'static str {
    "ok"
}

#[utoipa::path(
    post,
    path = "/api/v1/contact-imports/preview",
    request_body(content = String, content_type = "text/csv"),
    params(("x-tenant-id" = String, Header, description = "Tenant ID")),
    responses(
        (status = 200, description = "Import preview", body = PreviewResult),
        (status = 400, description = "Invalid file"),
        (status = 413, description = "File too large"),
    )
)]
pub async fn preview_import(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PreviewResult>, ImportError> {
    let tenant_id = tenant_id(&headers)?;
    let result = state.preview_import_uc.execute(&tenant_id, &body)?;
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/v1/contact-imports",
    request_body = StartImportRequest,
    params(("x-tenant-id" = String, Header, description = "Tenant ID")),
    responses(
        (status = 200, description = "Import finished synchronously", body = ImportJob),
        (status = 202, description = "Import accepted", body = AcceptedImportResponse),
        (status = 400, description = "Invalid file or column mapping"),
        (status = 413, description = "File too large"),
    )
)]
pub async fn start_import(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<StartImportRequest>,
) -> Result<Response, ImportError> {
    let tenant_id = tenant_id(&headers)?;
    if req.file_name.trim().is_empty() {
        return Err(ImportError::Validation("file_name is required".to_string()));
    }

    let input = StartImportInput {
        tenant_id,
        file_name: req.file_name,
        content: req.content.into_bytes(),
        delimiter: req.delimiter,
        column_mapping: req.column_mapping,
        options: ImportOptions {
            update_existing: req.update_existing,
            all_have_consent: req.all_have_consent,
            consent_source: req.consent_source,
            consent_date: req.consent_date,
            auto_tag_id: req.auto_tag_id,
        },
    };

    let response = match state.start_import_uc.execute(input).await? {
        StartImportOutcome::Completed(job) => (StatusCode::OK, Json(job)).into_response(),
        StartImportOutcome::Accepted(job_id) => (
            StatusCode::ACCEPTED,
            Json(AcceptedImportResponse {
                job_id: job_id.to_string(),
                status: "accepted".to_string(),
            }),
        )
            .into_response(),
    };
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/api/v1/contact-imports/{job_id}",
    params(
        ("job_id" = String, Path, description = "Import job ID"),
        ("x-tenant-id" = String, Header, description = "Tenant ID"),
    ),
    responses(
        (status = 200, description = "Import job snapshot", body = ImportJob),
        (status = 404, description = "Import job not found"),
    )
)]
pub async fn get_import_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Result<Json<ImportJob>, ImportError> {
    let tenant_id = tenant_id(&headers)?;
    let id = parse_job_id(&job_id)?;
    let job = state
        .get_import_job_uc
        .execute(&tenant_id, id)
        .await
        .map_err(|e| ImportError::Internal(e.to_string()))?
        .ok_or_else(|| ImportError::NotFound(job_id))?;
    Ok(Json(job))
}

#[utoipa::path(
    post,
    path = "/api/v1/contact-imports/{job_id}/cancel",
    params(
        ("job_id" = String, Path, description = "Import job ID"),
        ("x-tenant-id" = String, Header, description = "Tenant ID"),
    ),
    responses(
        (status = 202, description = "Cancellation requested", body = ImportJob),
        (status = 404, description = "Import job not found"),
        (status = 409, description = "Already terminal"),
    )
)]
pub async fn cancel_import_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Result<(StatusCode, Json<ImportJob>), ImportError> {
    let tenant_id = tenant_id(&headers)?;
    let id = parse_job_id(&job_id)?;
    let job = state.cancel_import_job_uc.execute(&tenant_id, id).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

fn tenant_id(headers: &HeaderMap) -> Result<String, ImportError> {
    headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ImportError::Validation(format!("{TENANT_HEADER} header is required")))
}

fn parse_job_id(job_id: &str) -> Result<Uuid, ImportError> {
    Uuid::parse_str(job_id)
        .map_err(|_| ImportError::Validation(format!("invalid job_id: {job_id}")))
}
