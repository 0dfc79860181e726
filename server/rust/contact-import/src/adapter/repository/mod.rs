pub mod contact_in_memory;
pub mod contact_postgres;
pub mod import_job_in_memory;
pub mod import_job_postgres;

pub use contact_in_memory::InMemoryContactRepository;
pub use contact_postgres::ContactPostgresRepository;
pub use import_job_in_memory::InMemoryImportJobRepository;
pub use import_job_postgres::ImportJobPostgresRepository;
