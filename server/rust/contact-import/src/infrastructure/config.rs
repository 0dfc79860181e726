use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::value_object::PhonePolicy;

/// Config はアプリケーション全体の設定。
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// YAML ファイルから設定を読み込む。
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&content)?;
        Ok(cfg)
    }
}

/// AppConfig はアプリケーション設定。
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

/// ServerConfig はサーバー設定。
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// DatabaseConfig はデータベース接続設定。
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(default = "default_password")]
    pub password: SecretString,
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_port() -> u16 {
    5432
}

fn default_password() -> SecretString {
    SecretString::new(String::new())
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

fn default_max_connections() -> u32 {
    25
}

impl DatabaseConfig {
    /// PostgreSQL接続URLを構築する。
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.name,
            self.ssl_mode
        )
    }
}

/// ImportConfig はインポートパイプライン固有の設定。
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
    #[serde(default = "default_phone_min_digits")]
    pub phone_min_digits: usize,
    #[serde(default = "default_phone_max_digits")]
    pub phone_max_digits: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_sync_row_limit")]
    pub sync_row_limit: usize,
    #[serde(default = "default_sync_wait_ms")]
    pub sync_wait_ms: u64,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: usize,
    #[serde(default = "default_preview_sample_rows")]
    pub preview_sample_rows: usize,
    #[serde(default = "default_detection_sample_lines")]
    pub detection_sample_lines: usize,
    #[serde(default = "default_max_concurrent_jobs_per_tenant")]
    pub max_concurrent_jobs_per_tenant: usize,
    #[serde(default = "default_max_recorded_issues")]
    pub max_recorded_issues: usize,
}

fn default_country_code() -> String {
    "55".to_string()
}

fn default_phone_min_digits() -> usize {
    10
}

fn default_phone_max_digits() -> usize {
    15
}

fn default_batch_size() -> usize {
    500
}

fn default_sync_row_limit() -> usize {
    1000
}

fn default_sync_wait_ms() -> u64 {
    5000
}

fn default_max_file_size_mb() -> usize {
    50
}

fn default_preview_sample_rows() -> usize {
    20
}

fn default_detection_sample_lines() -> usize {
    20
}

fn default_max_concurrent_jobs_per_tenant() -> usize {
    2
}

fn default_max_recorded_issues() -> usize {
    1000
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_country_code: default_country_code(),
            phone_min_digits: default_phone_min_digits(),
            phone_max_digits: default_phone_max_digits(),
            batch_size: default_batch_size(),
            sync_row_limit: default_sync_row_limit(),
            sync_wait_ms: default_sync_wait_ms(),
            max_file_size_mb: default_max_file_size_mb(),
            preview_sample_rows: default_preview_sample_rows(),
            detection_sample_lines: default_detection_sample_lines(),
            max_concurrent_jobs_per_tenant: default_max_concurrent_jobs_per_tenant(),
            max_recorded_issues: default_max_recorded_issues(),
        }
    }
}

impl ImportConfig {
    pub fn phone_policy(&self) -> PhonePolicy {
        PhonePolicy {
            country_code: self.default_country_code.clone(),
            min_digits: self.phone_min_digits,
            max_digits: self.phone_max_digits,
        }
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    /// プレビュー行数は 10〜50 に収める。
    pub fn preview_rows(&self) -> usize {
        self.preview_sample_rows.clamp(10, 50)
    }
}

/// LoggingConfig はログ出力設定。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}
