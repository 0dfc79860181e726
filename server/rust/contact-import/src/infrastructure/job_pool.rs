use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// JobPool はテナント単位の同時実行数制限と、実行中ジョブのキャンセルトークンを管理する。
///
/// 許可を待っている間、ジョブは pending のまま残る。
#[derive(Debug)]
pub struct JobPool {
    max_per_tenant: usize,
    tenants: Mutex<HashMap<String, Arc<Semaphore>>>,
    tokens: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl JobPool {
    pub fn new(max_per_tenant: usize) -> Self {
        Self {
            max_per_tenant: max_per_tenant.max(1),
            tenants: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// テナントの実行枠を1つ獲得するまで待つ。permit を drop すると枠が解放される。
    pub async fn acquire(&self, tenant_id: &str) -> anyhow::Result<OwnedSemaphorePermit> {
        let semaphore = {
            let mut tenants = self.tenants.lock().await;
            tenants
                .entry(tenant_id.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.max_per_tenant)))
                .clone()
        };
        semaphore
            .acquire_owned()
            .await
            .map_err(|e| anyhow::anyhow!("job pool closed for tenant {tenant_id}: {e}"))
    }

    /// ジョブのキャンセルトークンを登録して返す。
    pub async fn register(&self, job_id: Uuid) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.lock().await.insert(job_id, token.clone());
        token
    }

    /// キャンセルを要求する。登録済み（実行中または待機中）のジョブであれば true。
    pub async fn cancel(&self, job_id: Uuid) -> bool {
        match self.tokens.lock().await.get(&job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// ジョブ終了時にトークンを破棄する。
    pub async fn release(&self, job_id: Uuid) {
        self.tokens.lock().await.remove(&job_id);
    }

    pub async fn live_jobs(&self) -> usize {
        self.tokens.lock().await.len()
    }
}
