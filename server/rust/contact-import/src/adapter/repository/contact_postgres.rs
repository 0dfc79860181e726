use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{CanonicalFields, Consent, Contact, ContactData};
use crate::domain::repository::ContactRepository;
use crate::domain::value_object::PhoneKey;

/// ContactPostgresRepository はPostgreSQL実装の連絡先リポジトリ。
/// (tenant_id, phone_key) の一意制約で重複作成を防ぐ。
pub struct ContactPostgresRepository {
    pool: PgPool,
}

impl ContactPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for ContactPostgresRepository {
    async fn find_by_phone_key(
        &self,
        tenant_id: &str,
        phone_key: &PhoneKey,
    ) -> anyhow::Result<Option<Contact>> {
        let row = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, tenant_id, phone_key, fields, custom_fields, tag_ids,
                   consent_source, consent_granted_on, created_at, updated_at
            FROM contact_import.contacts
            WHERE tenant_id = $1 AND phone_key = $2
            "#,
        )
        .bind(tenant_id)
        .bind(phone_key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Contact::from))
    }

    async fn create(&self, tenant_id: &str, data: ContactData) -> anyhow::Result<Contact> {
        let contact = Contact::new(tenant_id, data);
        let (consent_source, consent_granted_on) = split_consent(contact.data.consent.as_ref());

        sqlx::query(
            r#"
            INSERT INTO contact_import.contacts
                (id, tenant_id, phone_key, fields, custom_fields, tag_ids,
                 consent_source, consent_granted_on, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(contact.id)
        .bind(&contact.tenant_id)
        .bind(contact.data.phone_key.as_str())
        .bind(Json(&contact.data.fields))
        .bind(Json(&contact.data.custom_fields))
        .bind(contact.data.tag_ids.iter().copied().collect::<Vec<Uuid>>())
        .bind(consent_source)
        .bind(consent_granted_on)
        .bind(contact.created_at)
        .bind(contact.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(contact)
    }

    async fn update(&self, tenant_id: &str, id: Uuid, data: ContactData) -> anyhow::Result<Contact> {
        let (consent_source, consent_granted_on) = split_consent(data.consent.as_ref());

        let row = sqlx::query_as::<_, ContactRow>(
            r#"
            UPDATE contact_import.contacts
            SET fields = $3, custom_fields = $4, tag_ids = $5,
                consent_source = $6, consent_granted_on = $7, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING id, tenant_id, phone_key, fields, custom_fields, tag_ids,
                      consent_source, consent_granted_on, created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(Json(&data.fields))
        .bind(Json(&data.custom_fields))
        .bind(data.tag_ids.iter().copied().collect::<Vec<Uuid>>())
        .bind(consent_source)
        .bind(consent_granted_on)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Contact::from)
            .ok_or_else(|| anyhow::anyhow!("contact not found: {id}"))
    }
}

fn split_consent(consent: Option<&Consent>) -> (Option<String>, Option<NaiveDate>) {
    match consent {
        Some(c) => (Some(c.source.clone()), Some(c.granted_on)),
        None => (None, None),
    }
}

/// ContactRow はDB行からのマッピング用。
#[derive(sqlx::FromRow)]
struct ContactRow {
    id: Uuid,
    tenant_id: String,
    phone_key: String,
    fields: Json<CanonicalFields>,
    custom_fields: Json<BTreeMap<String, String>>,
    tag_ids: Vec<Uuid>,
    consent_source: Option<String>,
    consent_granted_on: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        let consent = match (row.consent_source, row.consent_granted_on) {
            (Some(source), Some(granted_on)) => Some(Consent { source, granted_on }),
            _ => None,
        };
        Contact {
            id: row.id,
            tenant_id: row.tenant_id,
            data: ContactData {
                phone_key: PhoneKey::from_normalized(row.phone_key),
                fields: row.fields.0,
                custom_fields: row.custom_fields.0,
                tag_ids: row.tag_ids.into_iter().collect(),
                consent,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
