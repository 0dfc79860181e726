use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entity::ImportJob;
use crate::domain::repository::ImportJobRepository;
use crate::infrastructure::job_pool::JobPool;

/// CancelImportJobError はキャンセル操作のエラーを型安全に表現する。
#[derive(Debug, thiserror::Error)]
pub enum CancelImportJobError {
    #[error("import job not found: {0}")]
    NotFound(Uuid),
    #[error("import job is already in terminal state: {0}")]
    AlreadyTerminal(String),
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

/// CancelImportJobUseCase はインポートジョブの協調キャンセルを担う。
pub struct CancelImportJobUseCase {
    job_repo: Arc<dyn ImportJobRepository>,
    pool: Arc<JobPool>,
}

impl CancelImportJobUseCase {
    pub fn new(job_repo: Arc<dyn ImportJobRepository>, pool: Arc<JobPool>) -> Self {
        Self { job_repo, pool }
    }

    /// キャンセルを要求し、その時点のスナップショットを返す。
    ///
    /// 実行中のジョブは現在のバッチを終えてから cancelled になる。
    /// 実行器を持たないジョブ（再起動で取り残されたもの）はここで直接 cancelled にする。
    /// 他テナントのジョブは NotFound になる。
    pub async fn execute(
        &self,
        tenant_id: &str,
        job_id: Uuid,
    ) -> Result<ImportJob, CancelImportJobError> {
        let job = self.find_active(tenant_id, job_id).await?;

        if self.pool.cancel(job_id).await {
            tracing::info!(job_id = %job_id, "import job cancellation requested");
            return Ok(job);
        }

        // 実行器は終了時に最終状態を保存してからトークンを破棄するため、読み直して判定する
        let mut job = self.find_active(tenant_id, job_id).await?;
        job.cancel().map_err(|e| CancelImportJobError::Internal(e.into()))?;
        self.job_repo.update(&job).await?;
        tracing::warn!(job_id = %job_id, "orphaned import job cancelled");
        Ok(job)
    }

    async fn find_active(
        &self,
        tenant_id: &str,
        job_id: Uuid,
    ) -> Result<ImportJob, CancelImportJobError> {
        let job = self
            .job_repo
            .find_by_id(job_id)
            .await?
            .filter(|job| job.tenant_id == tenant_id)
            .ok_or(CancelImportJobError::NotFound(job_id))?;
        if job.is_terminal() {
            return Err(CancelImportJobError::AlreadyTerminal(job.status.to_string()));
        }
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockImportJobRepository;
    use crate::domain::value_object::ImportStatus;

    #[tokio::test]
    async fn test_cancel_live_job_signals_token() {
        let job = ImportJob::new("tenant-a", "contacts.csv");
        let job_id = job.id;
        let mut mock = MockImportJobRepository::new();
        mock.expect_find_by_id()
            .returning(move |_| Ok(Some(job.clone())));
        mock.expect_update().never();

        let pool = Arc::new(JobPool::new(2));
        let token = pool.register(job_id).await;

        let uc = CancelImportJobUseCase::new(Arc::new(mock), pool);
        let snapshot = uc.execute("tenant-a", job_id).await.unwrap();
        assert_eq!(snapshot.status, ImportStatus::Pending);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_orphaned_job_marks_cancelled() {
        let mut job = ImportJob::new("tenant-a", "contacts.csv");
        job.start(10).unwrap();
        let job_id = job.id;
        let mut mock = MockImportJobRepository::new();
        mock.expect_find_by_id()
            .returning(move |_| Ok(Some(job.clone())));
        mock.expect_update()
            .withf(|job| job.status == ImportStatus::Cancelled)
            .times(1)
            .returning(|_| Ok(()));

        let uc = CancelImportJobUseCase::new(Arc::new(mock), Arc::new(JobPool::new(2)));
        let cancelled = uc.execute("tenant-a", job_id).await.unwrap();
        assert_eq!(cancelled.status, ImportStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_not_found() {
        let mut mock = MockImportJobRepository::new();
        mock.expect_find_by_id().returning(|_| Ok(None));

        let uc = CancelImportJobUseCase::new(Arc::new(mock), Arc::new(JobPool::new(2)));
        let result = uc.execute("tenant-a", Uuid::new_v4()).await;
        assert!(matches!(result, Err(CancelImportJobError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cancel_already_terminal() {
        let mut job = ImportJob::new("tenant-a", "contacts.csv");
        job.start(1).unwrap();
        job.complete().unwrap();
        let job_id = job.id;
        let mut mock = MockImportJobRepository::new();
        mock.expect_find_by_id()
            .returning(move |_| Ok(Some(job.clone())));

        let uc = CancelImportJobUseCase::new(Arc::new(mock), Arc::new(JobPool::new(2)));
        let result = uc.execute("tenant-a", job_id).await;
        assert!(matches!(result, Err(CancelImportJobError::AlreadyTerminal(_))));
    }

    #[tokio::test]
    async fn test_cancel_job_of_other_tenant_is_not_found() {
        let job = ImportJob::new("tenant-a", "contacts.csv");
        let job_id = job.id;
        let mut mock = MockImportJobRepository::new();
        mock.expect_find_by_id()
            .returning(move |_| Ok(Some(job.clone())));
        mock.expect_update().never();

        let pool = Arc::new(JobPool::new(2));
        let token = pool.register(job_id).await;

        let uc = CancelImportJobUseCase::new(Arc::new(mock), pool);
        let result = uc.execute("tenant-b", job_id).await;
        assert!(matches!(result, Err(CancelImportJobError::NotFound(_))));
        assert!(!token.is_cancelled());
    }
}
