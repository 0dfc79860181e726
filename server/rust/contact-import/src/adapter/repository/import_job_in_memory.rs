use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entity::ImportJob;
use crate::domain::repository::ImportJobRepository;

/// InMemoryImportJobRepository はインメモリのジョブリポジトリ。
/// スナップショット全体を置き換えるため、読み手が途中状態を見ることはない。
pub struct InMemoryImportJobRepository {
    jobs: RwLock<HashMap<Uuid, ImportJob>>,
}

impl InMemoryImportJobRepository {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryImportJobRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImportJobRepository for InMemoryImportJobRepository {
    async fn create(&self, job: &ImportJob) -> anyhow::Result<()> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn update(&self, job: &ImportJob) -> anyhow::Result<()> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job.id) {
            Some(existing) => {
                *existing = job.clone();
                Ok(())
            }
            None => anyhow::bail!("import job not found: {}", job.id),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<ImportJob>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }
}
