use serde::{Deserialize, Serialize};

use crate::domain::value_object::CanonicalField;

/// ColumnTarget は1つのソース列の割り当て先。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum ColumnTarget {
    /// 既知フィールドへ割り当てる。
    Field(CanonicalField),
    /// 電話番号の市外局番列（分割電話列の慣習が検出された場合のみ）。
    AreaCode,
    /// ヘッダー文字列をキーとしてカスタムフィールドに保持する。
    Custom,
    Ignored,
}

/// ColumnAssignment はヘッダーと割り当て先の組。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ColumnAssignment {
    pub header: String,
    pub target: ColumnTarget,
}

/// MappingError はフル実行に渡されたマッピングがファイルと整合しない場合のエラー。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("column mapping has no phone column")]
    MissingPhoneColumn,

    #[error("column mapping assigns phone to more than one column")]
    DuplicatePhoneColumn,

    #[error("file header '{0}' is not present in the column mapping")]
    UnmappedHeader(String),

    #[error("column mapping has {mapping} columns but the file has {file}")]
    ColumnCountMismatch { mapping: usize, file: usize },
}

/// ColumnMapping はソースヘッダーから正規フィールドへの不変な対応表。
/// プレビューとフル実行で同一のものを使い回す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    assignments: Vec<ColumnAssignment>,
}

impl ColumnMapping {
    pub fn new(assignments: Vec<ColumnAssignment>) -> Self {
        Self { assignments }
    }

    pub fn assignments(&self) -> &[ColumnAssignment] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// 列位置の割り当て先を返す。範囲外は Ignored 扱い。
    pub fn target_at(&self, index: usize) -> ColumnTarget {
        self.assignments
            .get(index)
            .map_or(ColumnTarget::Ignored, |a| a.target)
    }

    /// 電話番号列の位置を返す。
    pub fn phone_index(&self) -> Option<usize> {
        self.assignments
            .iter()
            .position(|a| a.target == ColumnTarget::Field(CanonicalField::Phone))
    }

    /// ファイルのヘッダー行に対してこのマッピングをそのまま適用できるか検証する。
    /// ヘッダーは位置と文字列の両方が一致していなければならない。
    pub fn validate_against(&self, headers: &[String]) -> Result<(), MappingError> {
        let phone_columns = self
            .assignments
            .iter()
            .filter(|a| a.target == ColumnTarget::Field(CanonicalField::Phone))
            .count();
        match phone_columns {
            0 => return Err(MappingError::MissingPhoneColumn),
            1 => {}
            _ => return Err(MappingError::DuplicatePhoneColumn),
        }

        for (idx, header) in headers.iter().enumerate() {
            match self.assignments.get(idx) {
                Some(a) if a.header == *header => {}
                _ => return Err(MappingError::UnmappedHeader(header.clone())),
            }
        }
        if self.assignments.len() != headers.len() {
            return Err(MappingError::ColumnCountMismatch {
                mapping: self.assignments.len(),
                file: headers.len(),
            });
        }
        Ok(())
    }
}
