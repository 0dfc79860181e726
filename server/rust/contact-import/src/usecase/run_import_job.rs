use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::entity::{ColumnMapping, ImportJob, RowOutcome};
use crate::domain::repository::ImportJobRepository;
use crate::domain::service::{ImportOptions, ReconciliationEngine, RowValidator};
use crate::domain::value_object::Delimiter;
use crate::infrastructure::csv_rows::{count_data_rows, CsvRowReader, RawRow};

/// ImportJobInput は確定済みのファイル内容・区切り文字・マッピング・ポリシー。
#[derive(Debug, Clone)]
pub struct ImportJobInput {
    pub text: String,
    pub delimiter: Delimiter,
    pub mapping: ColumnMapping,
    pub options: ImportOptions,
}

/// RunnerSettings はバッチサイズと記録する問題数の上限。
#[derive(Debug, Clone, Copy)]
pub struct RunnerSettings {
    pub batch_size: usize,
    pub max_recorded_issues: usize,
}

/// ImportJobRunner は1ジョブ専用の実行器。ジョブのカウンタを単独で所有し、終了時に破棄される。
pub struct ImportJobRunner {
    job: ImportJob,
    input: ImportJobInput,
    validator: RowValidator,
    engine: ReconciliationEngine,
    job_repo: Arc<dyn ImportJobRepository>,
    cancel: CancellationToken,
    settings: RunnerSettings,
}

impl ImportJobRunner {
    pub fn new(
        job: ImportJob,
        input: ImportJobInput,
        validator: RowValidator,
        engine: ReconciliationEngine,
        job_repo: Arc<dyn ImportJobRepository>,
        cancel: CancellationToken,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            job,
            input,
            validator,
            engine,
            job_repo,
            cancel,
            settings: RunnerSettings {
                batch_size: settings.batch_size.max(1),
                ..settings
            },
        }
    }

    /// ジョブを終端状態まで進め、最終スナップショットを返す。
    pub async fn run(mut self) -> ImportJob {
        if let Err(e) = self.drive().await {
            error!(job_id = %self.job.id, tenant_id = %self.job.tenant_id, error = %e, "import job failed");
            if !self.job.is_terminal() {
                if let Err(te) = self.job.fail(e.to_string()) {
                    error!(job_id = %self.job.id, error = %te, "could not mark import job as failed");
                }
            }
        }
        self.finish().await
    }

    /// 実行前に中断されたジョブを failed にする。
    pub async fn abort(mut self, reason: &str) -> ImportJob {
        error!(job_id = %self.job.id, reason = %reason, "import job aborted before start");
        if let Err(e) = self.job.fail(reason) {
            error!(job_id = %self.job.id, error = %e, "could not mark import job as failed");
        }
        self.finish().await
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        // 実行枠待ちの間にキャンセルされた場合
        if self.cancel.is_cancelled() {
            self.job.cancel()?;
            warn!(job_id = %self.job.id, "import job cancelled before start");
            return Ok(());
        }

        let text = std::mem::take(&mut self.input.text);
        let total = count_data_rows(&text, self.input.delimiter)?;
        self.job.start(i64::try_from(total)?)?;
        self.job_repo.update(&self.job).await?;
        info!(
            job_id = %self.job.id,
            tenant_id = %self.job.tenant_id,
            total_rows = total,
            "import job started"
        );

        let mut reader = CsvRowReader::new(&text, self.input.delimiter);
        reader.headers()?;
        loop {
            if self.cancel.is_cancelled() {
                self.job.cancel()?;
                warn!(
                    job_id = %self.job.id,
                    processed_rows = self.job.processed_rows,
                    "import job cancelled"
                );
                return Ok(());
            }

            let batch = reader.next_batch(self.settings.batch_size)?;
            if batch.is_empty() {
                break;
            }
            let result = self.process_batch(batch).await;
            // 障害時も確定済みのカウンタを残す
            self.job_repo.update(&self.job).await?;
            result?;
        }

        self.job.complete()?;
        info!(
            job_id = %self.job.id,
            created = self.job.created_count,
            updated = self.job.updated_count,
            skipped = self.job.skipped_count,
            errors = self.job.error_count,
            "import job completed"
        );
        Ok(())
    }

    async fn process_batch(&mut self, batch: Vec<RawRow>) -> anyhow::Result<()> {
        let limit = self.settings.max_recorded_issues;
        for row in batch {
            let outcome = match self
                .validator
                .validate(row.number, &row.cells, &self.input.mapping)
            {
                Ok((record, warnings)) => {
                    self.job.add_warnings(warnings, limit);
                    self.engine
                        .reconcile(&self.job.tenant_id, record, &self.input.options)
                        .await?
                }
                Err(e) => RowOutcome::Error(e.to_string()),
            };
            self.job.record_outcome(row.number, &outcome, limit)?;
        }
        Ok(())
    }

    async fn finish(self) -> ImportJob {
        if let Err(e) = self.job_repo.update(&self.job).await {
            error!(job_id = %self.job.id, error = %e, "failed to persist final import job snapshot");
        }
        self.job
    }
}
