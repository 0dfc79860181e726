use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{ImportJob, RowIssue, ValidationWarning};
use crate::domain::repository::ImportJobRepository;
use crate::domain::value_object::ImportStatus;

/// ImportJobPostgresRepository はPostgreSQL実装のインポートジョブリポジトリ。
/// update は1文で行全体を書き換えるため、読み手は常に整合したスナップショットを得る。
pub struct ImportJobPostgresRepository {
    pool: PgPool,
}

impl ImportJobPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportJobRepository for ImportJobPostgresRepository {
    async fn create(&self, job: &ImportJob) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO contact_import.import_jobs
                (id, tenant_id, file_name, status, total_rows, processed_rows, created_count,
                 updated_count, skipped_count, error_count, errors, warnings, failure_reason,
                 created_at, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(job.id)
        .bind(&job.tenant_id)
        .bind(&job.file_name)
        .bind(job.status.to_string())
        .bind(job.total_rows)
        .bind(job.processed_rows)
        .bind(job.created_count)
        .bind(job.updated_count)
        .bind(job.skipped_count)
        .bind(job.error_count)
        .bind(Json(&job.errors))
        .bind(Json(&job.warnings))
        .bind(&job.failure_reason)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, job: &ImportJob) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE contact_import.import_jobs
            SET status = $2, total_rows = $3, processed_rows = $4, created_count = $5,
                updated_count = $6, skipped_count = $7, error_count = $8, errors = $9,
                warnings = $10, failure_reason = $11, started_at = $12, completed_at = $13
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(job.status.to_string())
        .bind(job.total_rows)
        .bind(job.processed_rows)
        .bind(job.created_count)
        .bind(job.updated_count)
        .bind(job.skipped_count)
        .bind(job.error_count)
        .bind(Json(&job.errors))
        .bind(Json(&job.warnings))
        .bind(&job.failure_reason)
        .bind(job.started_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("import job not found: {}", job.id);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<ImportJob>> {
        let row = sqlx::query_as::<_, ImportJobRow>(
            r#"
            SELECT id, tenant_id, file_name, status, total_rows, processed_rows, created_count,
                   updated_count, skipped_count, error_count, errors, warnings, failure_reason,
                   created_at, started_at, completed_at
            FROM contact_import.import_jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }
}

/// ImportJobRow はDB行からのマッピング用。
#[derive(sqlx::FromRow)]
struct ImportJobRow {
    id: Uuid,
    tenant_id: String,
    file_name: String,
    status: String,
    total_rows: Option<i64>,
    processed_rows: i64,
    created_count: i64,
    updated_count: i64,
    skipped_count: i64,
    error_count: i64,
    errors: Json<Vec<RowIssue>>,
    warnings: Json<Vec<ValidationWarning>>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ImportJobRow> for ImportJob {
    type Error = anyhow::Error;

    fn try_from(row: ImportJobRow) -> anyhow::Result<Self> {
        Ok(ImportJob {
            id: row.id,
            tenant_id: row.tenant_id,
            file_name: row.file_name,
            status: ImportStatus::from_str_value(&row.status)?,
            total_rows: row.total_rows,
            processed_rows: row.processed_rows,
            created_count: row.created_count,
            updated_count: row.updated_count,
            skipped_count: row.skipped_count,
            error_count: row.error_count,
            errors: row.errors.0,
            warnings: row.warnings.0,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}
