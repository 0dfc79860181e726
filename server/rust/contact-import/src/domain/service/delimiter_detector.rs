use std::collections::HashMap;

use csv::ReaderBuilder;

use crate::domain::service::column_mapper::ColumnMapper;
use crate::domain::value_object::Delimiter;

/// 採用に必要な、最頻列数と一致するサンプル行の割合。
const MIN_AGREEMENT: f64 = 0.9;

/// FileFormatError はジョブ作成前にファイルを拒否するエラー。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileFormatError {
    #[error("file is empty")]
    Empty,

    #[error("file size {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("could not detect a consistent delimiter")]
    UndetectableFormat,

    #[error("file has no header row")]
    MissingHeader,
}

/// DecodedContent はテキストへ復号したファイル内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedContent {
    pub text: String,
    pub encoding: &'static str,
}

/// DetectedFormat は区切り文字検出の結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedFormat {
    pub delimiter: Delimiter,
    pub headers: Vec<String>,
    pub split_phone: bool,
}

/// BOM を除去してテキストへ復号する。UTF-8 として不正なら Windows-1252 とみなす。
pub fn decode_content(bytes: &[u8]) -> Result<DecodedContent, FileFormatError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let decoded = match std::str::from_utf8(bytes) {
        Ok(text) => DecodedContent {
            text: text.to_string(),
            encoding: encoding_rs::UTF_8.name(),
        },
        Err(_) => {
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            DecodedContent {
                text: text.into_owned(),
                encoding: encoding_rs::WINDOWS_1252.name(),
            }
        }
    };
    if decoded.text.trim().is_empty() {
        return Err(FileFormatError::Empty);
    }
    Ok(decoded)
}

/// 空白と区切り文字候補以外を含む行の数からヘッダー行を除いた、データ行数の概算。
pub fn estimate_data_rows(text: &str) -> usize {
    text.lines()
        .filter(|line| {
            line.chars()
                .any(|c| !c.is_whitespace() && !matches!(c, ',' | ';' | '|'))
        })
        .count()
        .saturating_sub(1)
}

/// DelimiterDetector は先頭のサンプル行から区切り文字とヘッダーを推定する。
#[derive(Debug, Clone)]
pub struct DelimiterDetector {
    sample_lines: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    delimiter: Delimiter,
    mode: usize,
    agreement: f64,
}

impl DelimiterDetector {
    pub fn new(sample_lines: usize) -> Self {
        Self {
            sample_lines: sample_lines.max(1),
        }
    }

    pub fn detect(&self, text: &str) -> Result<DetectedFormat, FileFormatError> {
        if text.trim().is_empty() {
            return Err(FileFormatError::Empty);
        }

        let mut best: Option<Candidate> = None;
        for delimiter in Delimiter::CANDIDATES {
            let Some(candidate) = self.score(text, delimiter) else {
                continue;
            };
            // 列数が多い方、次に一致率が高い方。同点なら候補順で先のものを残す。
            let better = best.is_none_or(|b| {
                candidate.mode > b.mode
                    || (candidate.mode == b.mode && candidate.agreement > b.agreement)
            });
            if better {
                best = Some(candidate);
            }
        }
        let chosen = best.ok_or(FileFormatError::UndetectableFormat)?;

        let sample = self.sample(text, chosen.delimiter);
        let headers: Vec<String> = sample
            .first()
            .ok_or(FileFormatError::MissingHeader)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(FileFormatError::MissingHeader);
        }

        let split_phone = detect_split_phone(&headers, &sample[1..]);
        Ok(DetectedFormat {
            delimiter: chosen.delimiter,
            headers,
            split_phone,
        })
    }

    fn score(&self, text: &str, delimiter: Delimiter) -> Option<Candidate> {
        let sample = self.sample(text, delimiter);
        if sample.is_empty() {
            return None;
        }
        let mut frequencies: HashMap<usize, usize> = HashMap::new();
        for record in &sample {
            *frequencies.entry(record.len()).or_default() += 1;
        }
        let (mode, hits) = frequencies
            .into_iter()
            .max_by_key(|&(columns, hits)| (hits, columns))?;

        #[allow(clippy::cast_precision_loss)]
        let agreement = hits as f64 / sample.len() as f64;
        (mode >= 2 && agreement >= MIN_AGREEMENT).then_some(Candidate {
            delimiter,
            mode,
            agreement,
        })
    }

    /// 引用符を考慮して先頭 sample_lines 件のレコードを読む。空行は csv リーダーが読み飛ばす。
    fn sample(&self, text: &str, delimiter: Delimiter) -> Vec<Vec<String>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter.as_byte())
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        reader
            .records()
            .filter_map(Result::ok)
            .filter(|record| record.iter().any(|cell| !cell.trim().is_empty()))
            .take(self.sample_lines)
            .map(|record| record.iter().map(str::to_string).collect())
            .collect()
    }
}

/// 市外局番列と電話列が両方あり、市外局番列のサンプル値が2〜3桁の数字であれば分割電話とみなす。
fn detect_split_phone(headers: &[String], rows: &[Vec<String>]) -> bool {
    let Some(area_idx) = headers
        .iter()
        .position(|h| ColumnMapper::is_area_code_header(h))
    else {
        return false;
    };
    if !headers.iter().any(|h| ColumnMapper::is_phone_header(h)) {
        return false;
    }
    rows.iter()
        .filter_map(|row| row.get(area_idx))
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .all(|cell| (2..=3).contains(&cell.len()) && cell.chars().all(|c| c.is_ascii_digit()))
}
