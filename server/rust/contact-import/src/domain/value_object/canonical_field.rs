use serde::{Deserialize, Serialize};

/// CanonicalField は連絡先スキーマの既知フィールド。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Name,
    Phone,
    Email,
    BirthDate,
    City,
    State,
    ReferredBy,
    Notes,
    LastPurchaseDate,
    LastPurchaseValue,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 10] = [
        Self::Name,
        Self::Phone,
        Self::Email,
        Self::BirthDate,
        Self::City,
        Self::State,
        Self::ReferredBy,
        Self::Notes,
        Self::LastPurchaseDate,
        Self::LastPurchaseValue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::BirthDate => "birth_date",
            Self::City => "city",
            Self::State => "state",
            Self::ReferredBy => "referred_by",
            Self::Notes => "notes",
            Self::LastPurchaseDate => "last_purchase_date",
            Self::LastPurchaseValue => "last_purchase_value",
        }
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
