use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entity::{Contact, ContactData};
use crate::domain::value_object::PhoneKey;

/// ContactRepository は外部連絡先ストアへのテナント単位のアクセス契約。
/// 各操作は単一レコードについて原子的であることを前提とする。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// 正規化済み電話番号で連絡先を検索する。
    async fn find_by_phone_key(
        &self,
        tenant_id: &str,
        phone_key: &PhoneKey,
    ) -> anyhow::Result<Option<Contact>>;

    /// 連絡先を新規作成する。
    async fn create(&self, tenant_id: &str, data: ContactData) -> anyhow::Result<Contact>;

    /// 既存の連絡先を置き換える。
    async fn update(&self, tenant_id: &str, id: Uuid, data: ContactData)
        -> anyhow::Result<Contact>;
}
