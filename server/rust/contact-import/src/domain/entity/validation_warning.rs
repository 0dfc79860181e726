use serde::{Deserialize, Serialize};

/// ValidationWarning は行を止めずに記録される検証警告。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ValidationWarning {
    /// データ行番号（ヘッダーを除き 1 始まり）。
    pub row: u64,
    pub field: Option<String>,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(row: u64, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.map(str::to_string),
            message: message.into(),
        }
    }
}
