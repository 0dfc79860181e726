pub mod contact_repository;
pub mod import_job_repository;

pub use contact_repository::ContactRepository;
pub use import_job_repository::ImportJobRepository;

#[cfg(test)]
pub use contact_repository::MockContactRepository;
#[cfg(test)]
pub use import_job_repository::MockImportJobRepository;
