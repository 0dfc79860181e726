pub mod cancel_import_job;
pub mod get_import_job;
pub mod preview_import;
pub mod run_import_job;
pub mod start_import;

pub use cancel_import_job::{CancelImportJobError, CancelImportJobUseCase};
pub use get_import_job::GetImportJobUseCase;
pub use preview_import::{PreviewImportError, PreviewImportUseCase, PreviewResult, PreviewRow};
pub use run_import_job::{ImportJobInput, ImportJobRunner, RunnerSettings};
pub use start_import::{StartImportError, StartImportInput, StartImportOutcome, StartImportUseCase};
