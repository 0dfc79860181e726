use serde::{Deserialize, Serialize};

/// ImportStatus はインポートジョブの状態を表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

/// 許可される状態遷移の一覧。ここに無い遷移はすべて拒否される。
const ALLOWED_TRANSITIONS: &[(ImportStatus, ImportStatus)] = &[
    (ImportStatus::Pending, ImportStatus::Processing),
    (ImportStatus::Pending, ImportStatus::Cancelled),
    (ImportStatus::Pending, ImportStatus::Failed),
    (ImportStatus::Processing, ImportStatus::Completed),
    (ImportStatus::Processing, ImportStatus::Failed),
    (ImportStatus::Processing, ImportStatus::Cancelled),
];

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl ImportStatus {
    pub fn from_str_value(s: &str) -> anyhow::Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => anyhow::bail!("invalid import status: {}", s),
        }
    }

    /// 終端状態かどうかを返す。
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// self から next への遷移が許可されているかを返す。
    pub fn can_transition_to(self, next: Self) -> bool {
        ALLOWED_TRANSITIONS
            .iter()
            .any(|&(from, to)| from == self && to == next)
    }
}
