use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::entity::{Consent, ContactData, ContactRecord, RowOutcome};
use crate::domain::repository::ContactRepository;

/// 同意ソースが指定されなかった場合の既定値。
pub const DEFAULT_CONSENT_SOURCE: &str = "import";

/// ImportOptions はジョブ単位の重複・同意・タグ付けポリシー。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub update_existing: bool,
    pub all_have_consent: bool,
    pub consent_source: Option<String>,
    pub consent_date: Option<NaiveDate>,
    pub auto_tag_id: Option<Uuid>,
}

impl ImportOptions {
    /// all_have_consent が有効な場合に付与する同意情報。
    pub fn consent(&self) -> Option<Consent> {
        self.all_have_consent.then(|| Consent {
            source: self
                .consent_source
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONSENT_SOURCE.to_string()),
            granted_on: self.consent_date.unwrap_or_else(|| Utc::now().date_naive()),
        })
    }
}

/// ReconciliationEngine は検証済みレコードを既存連絡先と突き合わせ、作成・更新・スキップを決める。
/// 行をまたぐ状態は持たない。
pub struct ReconciliationEngine {
    contacts: Arc<dyn ContactRepository>,
}

impl ReconciliationEngine {
    pub fn new(contacts: Arc<dyn ContactRepository>) -> Self {
        Self { contacts }
    }

    /// 1行を反映する。ストアへの書き込みは作成・更新時に1回だけ。ストアのエラーはそのまま返す。
    pub async fn reconcile(
        &self,
        tenant_id: &str,
        record: ContactRecord,
        options: &ImportOptions,
    ) -> anyhow::Result<RowOutcome> {
        let existing = self
            .contacts
            .find_by_phone_key(tenant_id, &record.phone_key)
            .await?;

        match existing {
            None => {
                let mut data = ContactData::from(record);
                data.tag_ids.extend(options.auto_tag_id);
                data.consent = options.consent();
                self.contacts.create(tenant_id, data).await?;
                Ok(RowOutcome::Created)
            }
            Some(_) if !options.update_existing => Ok(RowOutcome::Skipped),
            Some(contact) => {
                let merged = merge(contact.data, record, options);
                self.contacts.update(tenant_id, contact.id, merged).await?;
                Ok(RowOutcome::Updated)
            }
        }
    }
}

/// 既存データへ取り込み値をマージする。
///
/// 正規フィールドは空でない取り込み値のみ上書きし、カスタムフィールドはキー単位で
/// 取り込み側を優先して和集合をとる。タグと同意は追加のみで削除しない。
pub fn merge(
    mut existing: ContactData,
    incoming: ContactRecord,
    options: &ImportOptions,
) -> ContactData {
    existing.fields.merge_non_empty(&incoming.fields);
    existing.custom_fields.extend(incoming.custom_fields);
    existing.tag_ids.extend(options.auto_tag_id);
    if existing.consent.is_none() {
        existing.consent = options.consent();
    }
    existing
}
