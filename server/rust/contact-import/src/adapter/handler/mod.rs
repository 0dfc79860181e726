pub mod error;
pub mod import_handler;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::usecase::{
    CancelImportJobUseCase, GetImportJobUseCase, PreviewImportUseCase, StartImportUseCase,
};

/// AppState はアプリケーション全体の共有状態を表す。
#[derive(Clone)]
pub struct AppState {
    pub preview_import_uc: Arc<PreviewImportUseCase>,
    pub start_import_uc: Arc<StartImportUseCase>,
    pub get_import_job_uc: Arc<GetImportJobUseCase>,
    pub cancel_import_job_uc: Arc<CancelImportJobUseCase>,
    /// リクエストボディの上限。ファイルサイズ上限の検査はユースケース側で行う。
    pub max_body_bytes: usize,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        import_handler::healthz,
        import_handler::readyz,
        import_handler::preview_import,
        import_handler::start_import,
        import_handler::get_import_job,
        import_handler::cancel_import_job,
    ),
    components(schemas(
        import_handler::StartImportRequest,
        import_handler::AcceptedImportResponse,
        crate::usecase::PreviewResult,
        crate::usecase::PreviewRow,
        crate::domain::entity::ImportJob,
        crate::domain::entity::ColumnAssignment,
        crate::domain::entity::ColumnTarget,
        crate::domain::entity::ContactRecord,
        crate::domain::entity::ValidationWarning,
        crate::domain::entity::RowIssue,
        crate::domain::value_object::Delimiter,
        crate::domain::value_object::ImportStatus,
        crate::domain::value_object::CanonicalField,
        ErrorResponse,
        ErrorBody,
    )),
)]
struct ApiDoc;

/// REST API ルーターを構築する。
pub fn router(state: AppState) -> Router {
    // JSON の構造分を上乗せする
    let body_limit = state.max_body_bytes.saturating_add(64 * 1024);

    Router::new()
        // Health / Readiness
        .route("/healthz", get(import_handler::healthz))
        .route("/readyz", get(import_handler::readyz))
        // Contact import endpoints
        .route(
            "/api/v1/contact-imports/preview",
            post(import_handler::preview_import),
        )
        .route("/api/v1/contact-imports", post(import_handler::start_import))
        .route(
            "/api/v1/contact-imports/{job_id}",
            get(import_handler::get_import_job),
        )
        .route(
            "/api/v1/contact-imports/{job_id}/cancel",
            post(import_handler::cancel_import_job),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

/// ErrorResponse は統一エラーレスポンス。
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub request_id: String,
    pub details: Vec<String>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
                request_id: uuid::Uuid::new_v4().to_string(),
                details: vec![],
            },
        }
    }
}
