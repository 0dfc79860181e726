pub mod column_mapping;
pub mod contact;
pub mod import_job;
pub mod validation_warning;

pub use column_mapping::{ColumnAssignment, ColumnMapping, ColumnTarget, MappingError};
pub use contact::{CanonicalFields, Consent, Contact, ContactData, ContactRecord};
pub use import_job::{ImportJob, ImportJobError, RowIssue, RowOutcome};
pub use validation_warning::ValidationWarning;
