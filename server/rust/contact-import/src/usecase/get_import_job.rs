use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entity::ImportJob;
use crate::domain::repository::ImportJobRepository;

/// GetImportJobUseCase はジョブの進捗スナップショット取得を担う。
pub struct GetImportJobUseCase {
    job_repo: Arc<dyn ImportJobRepository>,
}

impl GetImportJobUseCase {
    pub fn new(job_repo: Arc<dyn ImportJobRepository>) -> Self {
        Self { job_repo }
    }

    /// 他テナントのジョブは存在しないものとして扱う。
    pub async fn execute(
        &self,
        tenant_id: &str,
        job_id: Uuid,
    ) -> anyhow::Result<Option<ImportJob>> {
        let job = self.job_repo.find_by_id(job_id).await?;
        Ok(job.filter(|job| job.tenant_id == tenant_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockImportJobRepository;

    #[tokio::test]
    async fn test_get_import_job_found() {
        let job = ImportJob::new("tenant-a", "contacts.csv");
        let job_id = job.id;
        let mut mock = MockImportJobRepository::new();
        mock.expect_find_by_id()
            .withf(move |id| *id == job_id)
            .returning(move |_| Ok(Some(job.clone())));

        let uc = GetImportJobUseCase::new(Arc::new(mock));
        let found = uc.execute("tenant-a", job_id).await.unwrap().unwrap();
        assert_eq!(found.id, job_id);
    }

    #[tokio::test]
    async fn test_get_import_job_not_found() {
        let mut mock = MockImportJobRepository::new();
        mock.expect_find_by_id().returning(|_| Ok(None));

        let uc = GetImportJobUseCase::new(Arc::new(mock));
        assert!(uc.execute("tenant-a", Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_import_job_of_other_tenant_is_hidden() {
        let job = ImportJob::new("tenant-a", "contacts.csv");
        let job_id = job.id;
        let mut mock = MockImportJobRepository::new();
        mock.expect_find_by_id()
            .returning(move |_| Ok(Some(job.clone())));

        let uc = GetImportJobUseCase::new(Arc::new(mock));
        assert!(uc.execute("tenant-b", job_id).await.unwrap().is_none());
    }
}
