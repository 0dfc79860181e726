use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entity::ImportJob;

/// ImportJobRepository はインポートジョブのスナップショット永続化のためのリポジトリトレイト。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImportJobRepository: Send + Sync {
    async fn create(&self, job: &ImportJob) -> anyhow::Result<()>;

    /// ジョブ全体を上書き保存する。読み手は常に完全なスナップショットを見る。
    async fn update(&self, job: &ImportJob) -> anyhow::Result<()>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<ImportJob>>;
}
