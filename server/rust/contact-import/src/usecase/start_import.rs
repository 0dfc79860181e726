use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use uuid::Uuid;

use crate::domain::entity::{ColumnMapping, ImportJob, MappingError};
use crate::domain::repository::{ContactRepository, ImportJobRepository};
use crate::domain::service::{
    decode_content, estimate_data_rows, FileFormatError, ImportOptions, ReconciliationEngine,
    RowValidator,
};
use crate::domain::value_object::Delimiter;
use crate::infrastructure::config::ImportConfig;
use crate::infrastructure::csv_rows::CsvRowReader;
use crate::infrastructure::job_pool::JobPool;
use crate::usecase::run_import_job::{ImportJobInput, ImportJobRunner, RunnerSettings};

/// StartImportInput はフル実行リクエスト。区切り文字とマッピングはプレビュー結果をそのまま使う。
#[derive(Debug, Clone)]
pub struct StartImportInput {
    pub tenant_id: String,
    pub file_name: String,
    pub content: Vec<u8>,
    pub delimiter: Delimiter,
    pub column_mapping: ColumnMapping,
    pub options: ImportOptions,
}

/// StartImportOutcome は同期完了した最終結果か、ポーリング用のジョブIDのどちらか。
#[derive(Debug, Clone, PartialEq)]
pub enum StartImportOutcome {
    Completed(ImportJob),
    Accepted(Uuid),
}

/// StartImportError はジョブ作成前にリクエストを拒否するエラー。
#[derive(Debug, thiserror::Error)]
pub enum StartImportError {
    #[error(transparent)]
    FileFormat(#[from] FileFormatError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

/// StartImportUseCase はインポートジョブの受付と起動を担う。
pub struct StartImportUseCase {
    contact_repo: Arc<dyn ContactRepository>,
    job_repo: Arc<dyn ImportJobRepository>,
    pool: Arc<JobPool>,
    config: ImportConfig,
}

impl StartImportUseCase {
    pub fn new(
        contact_repo: Arc<dyn ContactRepository>,
        job_repo: Arc<dyn ImportJobRepository>,
        pool: Arc<JobPool>,
        config: ImportConfig,
    ) -> Self {
        Self {
            contact_repo,
            job_repo,
            pool,
            config,
        }
    }

    /// ファイル検証 → ジョブ作成（pending）→ バックグラウンド実行。
    /// 小さいファイルは sync_wait_ms まで完了を待ち、最終結果を返す。
    pub async fn execute(
        &self,
        input: StartImportInput,
    ) -> Result<StartImportOutcome, StartImportError> {
        let StartImportInput {
            tenant_id,
            file_name,
            content,
            delimiter,
            column_mapping,
            options,
        } = input;
        let limit = self.config.max_file_size_bytes();
        if content.len() > limit {
            return Err(FileFormatError::TooLarge {
                size: content.len(),
                limit,
            }
            .into());
        }
        // 復号後は元のバイト列を保持しない
        let decoded = decode_content(&content)?;
        drop(content);
        let headers = CsvRowReader::new(&decoded.text, delimiter)
            .headers()
            .map_err(|_| FileFormatError::MissingHeader)?;
        if headers.iter().all(String::is_empty) {
            return Err(FileFormatError::MissingHeader.into());
        }
        column_mapping.validate_against(&headers)?;

        let estimated_rows = estimate_data_rows(&decoded.text);
        let job = ImportJob::new(&tenant_id, &file_name);
        let job_id = job.id;
        self.job_repo.create(&job).await?;
        info!(
            job_id = %job_id,
            tenant_id = %tenant_id,
            file_name = %file_name,
            encoding = decoded.encoding,
            estimated_rows,
            "import job accepted"
        );

        let cancel = self.pool.register(job_id).await;
        let queued_cancel = cancel.clone();
        let runner = ImportJobRunner::new(
            job,
            ImportJobInput {
                text: decoded.text,
                delimiter,
                mapping: column_mapping,
                options,
            },
            RowValidator::new(self.config.phone_policy()),
            ReconciliationEngine::new(self.contact_repo.clone()),
            self.job_repo.clone(),
            cancel,
            RunnerSettings {
                batch_size: self.config.batch_size,
                max_recorded_issues: self.config.max_recorded_issues,
            },
        );

        let pool = self.pool.clone();
        let mut handle = tokio::spawn(async move {
            // 実行枠を待つ間のキャンセルは、枠を取らずに pending から cancelled にする
            let job = tokio::select! {
                biased;
                () = queued_cancel.cancelled() => runner.run().await,
                permit = pool.acquire(&tenant_id) => match permit {
                    Ok(permit) => {
                        let job = runner.run().await;
                        drop(permit);
                        job
                    }
                    Err(e) => runner.abort(&e.to_string()).await,
                },
            };
            pool.release(job.id).await;
            job
        });

        if estimated_rows > self.config.sync_row_limit {
            return Ok(StartImportOutcome::Accepted(job_id));
        }
        let wait = Duration::from_millis(self.config.sync_wait_ms);
        match tokio::time::timeout(wait, &mut handle).await {
            Ok(Ok(job)) => Ok(StartImportOutcome::Completed(job)),
            Ok(Err(e)) => {
                error!(job_id = %job_id, error = %e, "import job task panicked");
                Err(StartImportError::Internal(anyhow::anyhow!(
                    "import job task failed: {e}"
                )))
            }
            // 待機上限を超えたらジョブIDを返し、実行は継続する
            Err(_) => Ok(StartImportOutcome::Accepted(job_id)),
        }
    }
}
