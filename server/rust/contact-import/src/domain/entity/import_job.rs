use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::validation_warning::ValidationWarning;
use crate::domain::value_object::ImportStatus;

/// ImportJobError はジョブ状態機械への不正な操作を表す。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportJobError {
    #[error("invalid import job transition: {from} -> {to}")]
    InvalidTransition { from: ImportStatus, to: ImportStatus },

    #[error("import job is not processing (status: {0})")]
    NotProcessing(ImportStatus),
}

/// RowIssue は行単位エラーの記録。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RowIssue {
    pub row: u64,
    pub message: String,
}

/// RowOutcome は1行の処理結果。4種は排他。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Created,
    Updated,
    Skipped,
    Error(String),
}

/// ImportJob は一括インポートジョブの進捗スナップショットを表す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ImportJob {
    pub id: Uuid,
    pub tenant_id: String,
    pub file_name: String,
    pub status: ImportStatus,
    pub total_rows: Option<i64>,
    pub processed_rows: i64,
    pub created_count: i64,
    pub updated_count: i64,
    pub skipped_count: i64,
    pub error_count: i64,
    pub errors: Vec<RowIssue>,
    pub warnings: Vec<ValidationWarning>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportJob {
    /// 受付直後の pending ジョブを作成する。
    pub fn new(tenant_id: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            file_name: file_name.into(),
            status: ImportStatus::Pending,
            total_rows: None,
            processed_rows: 0,
            created_count: 0,
            updated_count: 0,
            skipped_count: 0,
            error_count: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            failure_reason: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// processing へ遷移し、総行数を確定する。
    pub fn start(&mut self, total_rows: i64) -> Result<(), ImportJobError> {
        self.transition(ImportStatus::Processing)?;
        self.total_rows = Some(total_rows);
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// 1行の結果をカウンタへ反映する。エラー記録は issue_limit 件で打ち切るがカウンタは数え続ける。
    pub fn record_outcome(
        &mut self,
        row: u64,
        outcome: &RowOutcome,
        issue_limit: usize,
    ) -> Result<(), ImportJobError> {
        if self.status != ImportStatus::Processing {
            return Err(ImportJobError::NotProcessing(self.status));
        }
        match outcome {
            RowOutcome::Created => self.created_count += 1,
            RowOutcome::Updated => self.updated_count += 1,
            RowOutcome::Skipped => self.skipped_count += 1,
            RowOutcome::Error(message) => {
                self.error_count += 1;
                if self.errors.len() < issue_limit {
                    self.errors.push(RowIssue {
                        row,
                        message: message.clone(),
                    });
                }
            }
        }
        self.processed_rows += 1;
        Ok(())
    }

    pub fn add_warnings(&mut self, warnings: Vec<ValidationWarning>, issue_limit: usize) {
        let room = issue_limit.saturating_sub(self.warnings.len());
        self.warnings.extend(warnings.into_iter().take(room));
    }

    pub fn complete(&mut self) -> Result<(), ImportJobError> {
        self.transition(ImportStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// failed へ遷移する。確定済みのカウンタはそのまま残す。
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), ImportJobError> {
        self.transition(ImportStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), ImportJobError> {
        self.transition(ImportStatus::Cancelled)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 各カウンタの合計が processed_rows に一致するか。
    pub fn counters_consistent(&self) -> bool {
        self.created_count + self.updated_count + self.skipped_count + self.error_count
            == self.processed_rows
    }

    fn transition(&mut self, next: ImportStatus) -> Result<(), ImportJobError> {
        if !self.status.can_transition_to(next) {
            return Err(ImportJobError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_job() -> ImportJob {
        ImportJob::new("tenant-a", "contacts.csv")
    }

    #[test]
    fn test_new_import_job() {
        let job = make_job();
        assert_eq!(job.status, ImportStatus::Pending);
        assert!(job.total_rows.is_none());
        assert_eq!(job.processed_rows, 0);
        assert!(job.started_at.is_none());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_start_and_complete() {
        let mut job = make_job();
        job.start(3).unwrap();
        assert_eq!(job.status, ImportStatus::Processing);
        assert_eq!(job.total_rows, Some(3));
        assert!(job.started_at.is_some());

        job.record_outcome(1, &RowOutcome::Created, 10).unwrap();
        job.record_outcome(2, &RowOutcome::Error("bad phone".to_string()), 10)
            .unwrap();
        job.record_outcome(3, &RowOutcome::Updated, 10).unwrap();
        job.complete().unwrap();

        assert_eq!(job.status, ImportStatus::Completed);
        assert_eq!(job.processed_rows, 3);
        assert_eq!(job.errors, vec![RowIssue { row: 2, message: "bad phone".to_string() }]);
        assert!(job.counters_consistent());
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_terminal_job_is_frozen() {
        let mut job = make_job();
        job.start(1).unwrap();
        job.complete().unwrap();

        assert_eq!(
            job.start(5).unwrap_err(),
            ImportJobError::InvalidTransition {
                from: ImportStatus::Completed,
                to: ImportStatus::Processing,
            }
        );
        assert!(job.cancel().is_err());
        assert!(job.fail("late").is_err());
        assert_eq!(
            job.record_outcome(2, &RowOutcome::Created, 10).unwrap_err(),
            ImportJobError::NotProcessing(ImportStatus::Completed)
        );
        assert_eq!(job.total_rows, Some(1));
    }

    #[test]
    fn test_pending_job_can_be_cancelled() {
        let mut job = make_job();
        job.cancel().unwrap();
        assert_eq!(job.status, ImportStatus::Cancelled);
        assert!(job.is_terminal());
    }

    #[test]
    fn test_fail_keeps_partial_counters() {
        let mut job = make_job();
        job.start(10).unwrap();
        job.record_outcome(1, &RowOutcome::Created, 10).unwrap();
        job.record_outcome(2, &RowOutcome::Skipped, 10).unwrap();
        job.fail("store unavailable").unwrap();

        assert_eq!(job.status, ImportStatus::Failed);
        assert_eq!(job.processed_rows, 2);
        assert_eq!(job.failure_reason.as_deref(), Some("store unavailable"));
        assert!(job.counters_consistent());
    }

    #[test]
    fn test_recorded_issues_are_capped() {
        let mut job = make_job();
        job.start(5).unwrap();
        for row in 1..=5 {
            job.record_outcome(row, &RowOutcome::Error("x".to_string()), 2)
                .unwrap();
        }
        assert_eq!(job.error_count, 5);
        assert_eq!(job.errors.len(), 2);

        let warnings = (1..=4)
            .map(|row| ValidationWarning::new(row, Some("email"), "invalid email"))
            .collect();
        job.add_warnings(warnings, 3);
        assert_eq!(job.warnings.len(), 3);
    }
}
