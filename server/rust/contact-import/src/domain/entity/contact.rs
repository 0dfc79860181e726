use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_object::{CanonicalField, PhoneKey};

/// CanonicalFields は連絡先の既知フィールド値。空文字は保持せず None とする。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CanonicalFields {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub referred_by: Option<String>,
    pub notes: Option<String>,
    pub last_purchase_date: Option<String>,
    pub last_purchase_value: Option<String>,
}

impl CanonicalFields {
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// 値を設定する。空白のみの値は None として扱う。
    pub fn set(&mut self, field: CanonicalField, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        *self.slot_mut(field) = if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
    }

    pub fn clear(&mut self, field: CanonicalField) {
        *self.slot_mut(field) = None;
    }

    /// incoming の値が空でないフィールドだけを上書きする。既存値を空で消すことはない。
    pub fn merge_non_empty(&mut self, incoming: &CanonicalFields) {
        for field in CanonicalField::ALL {
            if let Some(value) = incoming.get(field) {
                *self.slot_mut(field) = Some(value.to_string());
            }
        }
    }

    fn slot(&self, field: CanonicalField) -> &Option<String> {
        match field {
            CanonicalField::Name => &self.name,
            CanonicalField::Phone => &self.phone,
            CanonicalField::Email => &self.email,
            CanonicalField::BirthDate => &self.birth_date,
            CanonicalField::City => &self.city,
            CanonicalField::State => &self.state,
            CanonicalField::ReferredBy => &self.referred_by,
            CanonicalField::Notes => &self.notes,
            CanonicalField::LastPurchaseDate => &self.last_purchase_date,
            CanonicalField::LastPurchaseValue => &self.last_purchase_value,
        }
    }

    fn slot_mut(&mut self, field: CanonicalField) -> &mut Option<String> {
        match field {
            CanonicalField::Name => &mut self.name,
            CanonicalField::Phone => &mut self.phone,
            CanonicalField::Email => &mut self.email,
            CanonicalField::BirthDate => &mut self.birth_date,
            CanonicalField::City => &mut self.city,
            CanonicalField::State => &mut self.state,
            CanonicalField::ReferredBy => &mut self.referred_by,
            CanonicalField::Notes => &mut self.notes,
            CanonicalField::LastPurchaseDate => &mut self.last_purchase_date,
            CanonicalField::LastPurchaseValue => &mut self.last_purchase_value,
        }
    }
}

/// ContactRecord は1行から組み立てた一時的な連絡先。ストアには直接保存されない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ContactRecord {
    #[schema(value_type = String)]
    pub phone_key: PhoneKey,
    #[serde(flatten)]
    pub fields: CanonicalFields,
    pub custom_fields: BTreeMap<String, String>,
}

/// Consent はメッセージ受信同意のメタデータ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Consent {
    pub source: String,
    pub granted_on: NaiveDate,
}

/// ContactData はストアへ作成・更新で渡す連絡先の内容。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactData {
    pub phone_key: PhoneKey,
    #[serde(flatten)]
    pub fields: CanonicalFields,
    pub custom_fields: BTreeMap<String, String>,
    pub tag_ids: BTreeSet<Uuid>,
    pub consent: Option<Consent>,
}

impl From<ContactRecord> for ContactData {
    fn from(record: ContactRecord) -> Self {
        Self {
            phone_key: record.phone_key,
            fields: record.fields,
            custom_fields: record.custom_fields,
            tag_ids: BTreeSet::new(),
            consent: None,
        }
    }
}

/// Contact は外部ストアが保持する連絡先。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub tenant_id: String,
    #[serde(flatten)]
    pub data: ContactData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn new(tenant_id: &str, data: ContactData) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            data,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_blank_is_none() {
        let mut fields = CanonicalFields::default();
        fields.set(CanonicalField::City, "   ");
        assert!(fields.city.is_none());
        fields.set(CanonicalField::City, " Campinas ");
        assert_eq!(fields.get(CanonicalField::City), Some("Campinas"));
    }

    #[test]
    fn test_merge_non_empty_keeps_existing() {
        let mut existing = CanonicalFields::default();
        existing.set(CanonicalField::City, "Recife");
        existing.set(CanonicalField::Name, "Ana");

        let mut incoming = CanonicalFields::default();
        incoming.set(CanonicalField::Name, "Ana Paula");

        existing.merge_non_empty(&incoming);
        assert_eq!(existing.get(CanonicalField::City), Some("Recife"));
        assert_eq!(existing.get(CanonicalField::Name), Some("Ana Paula"));
    }

    #[test]
    fn test_record_into_data_has_no_tags_or_consent() {
        let record = ContactRecord {
            phone_key: PhoneKey::from_normalized("5511988887777"),
            fields: CanonicalFields::default(),
            custom_fields: BTreeMap::from([("Valor".to_string(), "50".to_string())]),
        };
        let data = ContactData::from(record);
        assert!(data.tag_ids.is_empty());
        assert!(data.consent.is_none());
        assert_eq!(data.custom_fields["Valor"], "50");
    }
}
