pub mod config;
pub mod csv_rows;
pub mod job_pool;
pub mod logger;
