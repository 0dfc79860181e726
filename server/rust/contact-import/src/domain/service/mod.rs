pub mod column_mapper;
pub mod delimiter_detector;
pub mod reconciliation;
pub mod row_validator;

pub use column_mapper::ColumnMapper;
pub use delimiter_detector::{
    decode_content, estimate_data_rows, DecodedContent, DelimiterDetector, DetectedFormat,
    FileFormatError,
};
pub use reconciliation::{ImportOptions, ReconciliationEngine};
pub use row_validator::{RowError, RowValidator};
