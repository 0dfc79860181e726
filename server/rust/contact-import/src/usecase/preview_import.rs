use serde::Serialize;
use tracing::debug;

use crate::domain::entity::{ColumnMapping, ContactRecord, ValidationWarning};
use crate::domain::service::{
    decode_content, estimate_data_rows, ColumnMapper, DelimiterDetector, FileFormatError,
    RowValidator,
};
use crate::domain::value_object::Delimiter;
use crate::infrastructure::config::ImportConfig;
use crate::infrastructure::csv_rows::CsvRowReader;

/// PreviewRow はサンプル1行の変換結果。record と error のどちらか一方を持つ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct PreviewRow {
    pub row: u64,
    pub cells: Vec<String>,
    pub record: Option<ContactRecord>,
    pub error: Option<String>,
}

/// PreviewResult はプレビュー結果。delimiter と column_mapping はそのままフル実行に渡せる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct PreviewResult {
    pub delimiter: Delimiter,
    pub encoding: String,
    pub headers: Vec<String>,
    #[schema(value_type = Vec<crate::domain::entity::ColumnAssignment>)]
    pub column_mapping: ColumnMapping,
    pub split_phone: bool,
    pub sample_rows: Vec<PreviewRow>,
    pub warnings: Vec<ValidationWarning>,
    pub estimated_total_rows: usize,
}

/// PreviewImportError はプレビューのエラー。
#[derive(Debug, thiserror::Error)]
pub enum PreviewImportError {
    #[error(transparent)]
    FileFormat(#[from] FileFormatError),
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

/// PreviewImportUseCase は検出・マッピング・検証を先頭サンプルにだけ適用する。ストアには触れない。
pub struct PreviewImportUseCase {
    config: ImportConfig,
}

impl PreviewImportUseCase {
    pub fn new(config: ImportConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, tenant_id: &str, content: &[u8]) -> Result<PreviewResult, PreviewImportError> {
        let limit = self.config.max_file_size_bytes();
        if content.len() > limit {
            return Err(FileFormatError::TooLarge {
                size: content.len(),
                limit,
            }
            .into());
        }

        let decoded = decode_content(content)?;
        let detected =
            DelimiterDetector::new(self.config.detection_sample_lines).detect(&decoded.text)?;
        let column_mapping = ColumnMapper::map_headers(&detected.headers, detected.split_phone);
        let validator = RowValidator::new(self.config.phone_policy());

        let mut reader = CsvRowReader::new(&decoded.text, detected.delimiter);
        reader.headers()?;
        let sample = reader.next_batch(self.config.preview_rows())?;

        let mut warnings = Vec::new();
        let sample_rows = sample
            .into_iter()
            .map(|raw| match validator.validate(raw.number, &raw.cells, &column_mapping) {
                Ok((record, row_warnings)) => {
                    warnings.extend(row_warnings);
                    PreviewRow {
                        row: raw.number,
                        cells: raw.cells,
                        record: Some(record),
                        error: None,
                    }
                }
                Err(e) => PreviewRow {
                    row: raw.number,
                    cells: raw.cells,
                    record: None,
                    error: Some(e.to_string()),
                },
            })
            .collect::<Vec<_>>();

        debug!(
            tenant_id = %tenant_id,
            delimiter = %detected.delimiter,
            encoding = decoded.encoding,
            sample_rows = sample_rows.len(),
            "import preview generated"
        );

        Ok(PreviewResult {
            delimiter: detected.delimiter,
            encoding: decoded.encoding.to_string(),
            headers: detected.headers,
            column_mapping,
            split_phone: detected.split_phone,
            sample_rows,
            warnings,
            estimated_total_rows: estimate_data_rows(&decoded.text),
        })
    }
}
