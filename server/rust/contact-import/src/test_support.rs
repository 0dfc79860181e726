//! 統合テスト用のアプリ組み立てヘルパー。
//! tests/integration_test.rs から利用する。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use uuid::Uuid;

use crate::adapter::handler::{self, AppState};
use crate::adapter::repository::{InMemoryContactRepository, InMemoryImportJobRepository};
use crate::domain::entity::{Contact, ContactData};
use crate::domain::repository::{ContactRepository, ImportJobRepository};
use crate::domain::value_object::PhoneKey;
use crate::infrastructure::config::ImportConfig;
use crate::infrastructure::job_pool::JobPool;
use crate::usecase::{
    CancelImportJobUseCase, GetImportJobUseCase, PreviewImportUseCase, StartImportUseCase,
};

/// TestApp はインメモリリポジトリで組み立てたルーターと、その裏のストア。
pub struct TestApp {
    pub router: Router,
    pub contacts: Arc<InMemoryContactRepository>,
    pub jobs: Arc<InMemoryImportJobRepository>,
}

/// 連絡先ストアの各呼び出しに遅延を入れるラッパー。実行中ジョブの観測に使う。
pub struct DelayedContactRepository {
    inner: Arc<InMemoryContactRepository>,
    delay: Duration,
}

impl DelayedContactRepository {
    pub fn new(inner: Arc<InMemoryContactRepository>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl ContactRepository for DelayedContactRepository {
    async fn find_by_phone_key(
        &self,
        tenant_id: &str,
        phone_key: &PhoneKey,
    ) -> anyhow::Result<Option<Contact>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_phone_key(tenant_id, phone_key).await
    }

    async fn create(&self, tenant_id: &str, data: ContactData) -> anyhow::Result<Contact> {
        self.inner.create(tenant_id, data).await
    }

    async fn update(&self, tenant_id: &str, id: Uuid, data: ContactData) -> anyhow::Result<Contact> {
        self.inner.update(tenant_id, id, data).await
    }
}

/// 既定設定のテスト用アプリ。
pub fn make_test_app() -> TestApp {
    make_test_app_with(ImportConfig::default(), None)
}

/// 設定と連絡先ストアの遅延を指定してテスト用アプリを組み立てる。
pub fn make_test_app_with(config: ImportConfig, store_delay: Option<Duration>) -> TestApp {
    let contacts = Arc::new(InMemoryContactRepository::new());
    let jobs = Arc::new(InMemoryImportJobRepository::new());

    let contact_repo: Arc<dyn ContactRepository> = match store_delay {
        Some(delay) => Arc::new(DelayedContactRepository::new(contacts.clone(), delay)),
        None => contacts.clone(),
    };
    let job_repo: Arc<dyn ImportJobRepository> = jobs.clone();
    let pool = Arc::new(JobPool::new(config.max_concurrent_jobs_per_tenant));

    let state = AppState {
        preview_import_uc: Arc::new(PreviewImportUseCase::new(config.clone())),
        start_import_uc: Arc::new(StartImportUseCase::new(
            contact_repo,
            job_repo.clone(),
            pool.clone(),
            config.clone(),
        )),
        get_import_job_uc: Arc::new(GetImportJobUseCase::new(job_repo.clone())),
        cancel_import_job_uc: Arc::new(CancelImportJobUseCase::new(job_repo, pool)),
        max_body_bytes: config.max_file_size_bytes(),
    };

    TestApp {
        router: handler::router(state),
        contacts,
        jobs,
    }
}
