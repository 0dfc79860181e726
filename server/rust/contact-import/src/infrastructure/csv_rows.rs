use csv::{Reader, ReaderBuilder, StringRecord};

use crate::domain::value_object::Delimiter;

/// RawRow はデータ行1件分のセル。number はヘッダーを除いた 1 始まりの行番号。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub number: u64,
    pub cells: Vec<String>,
}

/// CsvRowReader は確定済みの区切り文字でデータ行をバッチ単位に読み出す。
/// 全セルが空の行は読み飛ばし、行番号も進めない。ヘッダーは最初の空でないレコード。
pub struct CsvRowReader<'a> {
    reader: Reader<&'a [u8]>,
    record: StringRecord,
    headers: Option<Vec<String>>,
    next_number: u64,
}

impl<'a> CsvRowReader<'a> {
    pub fn new(text: &'a str, delimiter: Delimiter) -> Self {
        let reader = ReaderBuilder::new()
            .delimiter(delimiter.as_byte())
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        Self {
            reader,
            record: StringRecord::new(),
            headers: None,
            next_number: 1,
        }
    }

    /// ヘッダー行を前後空白を除いて返す。空のファイルでは空のベクタ。
    pub fn headers(&mut self) -> anyhow::Result<Vec<String>> {
        if let Some(headers) = &self.headers {
            return Ok(headers.clone());
        }
        let headers = if self.read_non_blank()? {
            self.record.iter().map(|h| h.trim().to_string()).collect()
        } else {
            Vec::new()
        };
        self.headers = Some(headers.clone());
        Ok(headers)
    }

    fn read_non_blank(&mut self) -> anyhow::Result<bool> {
        while self.reader.read_record(&mut self.record)? {
            if self.record.iter().any(|cell| !cell.trim().is_empty()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 最大 size 行を読む。空のベクタは終端を意味する。壊れたレコードはエラーとして返す。
    pub fn next_batch(&mut self, size: usize) -> anyhow::Result<Vec<RawRow>> {
        if self.headers.is_none() {
            self.headers()?;
        }
        let mut batch = Vec::with_capacity(size);
        while batch.len() < size {
            if !self.read_non_blank()? {
                break;
            }
            batch.push(RawRow {
                number: self.next_number,
                cells: self.record.iter().map(str::to_string).collect(),
            });
            self.next_number += 1;
        }
        Ok(batch)
    }
}

/// 空行を除いたデータ行数を数える。
pub fn count_data_rows(text: &str, delimiter: Delimiter) -> anyhow::Result<usize> {
    let mut reader = CsvRowReader::new(text, delimiter);
    let mut total = 0;
    loop {
        let batch = reader.next_batch(1024)?;
        if batch.is_empty() {
            return Ok(total);
        }
        total += batch.len();
    }
}
