use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entity::{Contact, ContactData};
use crate::domain::repository::ContactRepository;
use crate::domain::value_object::PhoneKey;

/// InMemoryContactRepository はインメモリの連絡先ストア。開発・テスト用。
pub struct InMemoryContactRepository {
    contacts: RwLock<HashMap<Uuid, Contact>>,
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self {
            contacts: RwLock::new(HashMap::new()),
        }
    }

    /// テナントの連絡先を作成日時順に返す。
    pub async fn list(&self, tenant_id: &str) -> Vec<Contact> {
        let contacts = self.contacts.read().await;
        let mut found: Vec<Contact> = contacts
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect();
        found.sort_by_key(|c| c.created_at);
        found
    }
}

impl Default for InMemoryContactRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn find_by_phone_key(
        &self,
        tenant_id: &str,
        phone_key: &PhoneKey,
    ) -> anyhow::Result<Option<Contact>> {
        let contacts = self.contacts.read().await;
        Ok(contacts
            .values()
            .find(|c| c.tenant_id == tenant_id && c.data.phone_key == *phone_key)
            .cloned())
    }

    async fn create(&self, tenant_id: &str, data: ContactData) -> anyhow::Result<Contact> {
        let contact = Contact::new(tenant_id, data);
        self.contacts
            .write()
            .await
            .insert(contact.id, contact.clone());
        Ok(contact)
    }

    async fn update(&self, tenant_id: &str, id: Uuid, data: ContactData) -> anyhow::Result<Contact> {
        let mut contacts = self.contacts.write().await;
        let contact = contacts
            .get_mut(&id)
            .filter(|c| c.tenant_id == tenant_id)
            .ok_or_else(|| anyhow::anyhow!("contact not found: {id}"))?;
        contact.data = data;
        contact.updated_at = Utc::now();
        Ok(contact.clone())
    }
}
