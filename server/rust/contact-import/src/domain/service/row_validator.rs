use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::domain::entity::{
    CanonicalFields, ColumnMapping, ColumnTarget, ContactRecord, ValidationWarning,
};
use crate::domain::value_object::{CanonicalField, PhoneError, PhoneKey, PhonePolicy};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// RowError は行を取り込み不可にするエラー。件数に数えられ、ジョブは継続する。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("required field missing: phone")]
    MissingPhone,

    #[error(transparent)]
    InvalidPhone(#[from] PhoneError),
}

/// ValidatedRow は検証済みの連絡先と、その行で記録された警告。
pub type ValidatedRow = (ContactRecord, Vec<ValidationWarning>);

/// RowValidator は1行の値を正規化・検証する。
///
/// 電話番号は識別キーなので失敗すれば行エラーとする。それ以外のフィールドの不正は
/// 警告に落としてフィールドを空にし、行の取り込みは続ける。
#[derive(Debug, Clone)]
pub struct RowValidator {
    policy: PhonePolicy,
}

impl RowValidator {
    pub fn new(policy: PhonePolicy) -> Self {
        Self { policy }
    }

    /// `row` はヘッダーを除いた 1 始まりのデータ行番号。
    pub fn validate(
        &self,
        row: u64,
        cells: &[String],
        mapping: &ColumnMapping,
    ) -> Result<ValidatedRow, RowError> {
        let mut warnings = Vec::new();
        if cells.len() > mapping.len() {
            warnings.push(ValidationWarning::new(
                row,
                None,
                format!(
                    "row has {} cells but the header has {}; extra cells were dropped",
                    cells.len(),
                    mapping.len()
                ),
            ));
        }

        let mut fields = CanonicalFields::default();
        let mut custom_fields = BTreeMap::new();
        let mut area_code = String::new();
        for (idx, assignment) in mapping.assignments().iter().enumerate() {
            let value = cells.get(idx).map_or("", |c| c.trim());
            match assignment.target {
                ColumnTarget::Field(field) => fields.set(field, value),
                ColumnTarget::AreaCode => area_code = value.to_string(),
                ColumnTarget::Custom if !value.is_empty() => {
                    custom_fields.insert(assignment.header.clone(), value.to_string());
                }
                ColumnTarget::Custom | ColumnTarget::Ignored => {}
            }
        }

        let raw_phone = fields
            .get(CanonicalField::Phone)
            .ok_or(RowError::MissingPhone)?;
        let raw_phone = with_area_code(&area_code, raw_phone);
        let phone_key = PhoneKey::normalize(&raw_phone, &self.policy)?;
        fields.set(CanonicalField::Phone, phone_key.as_str());

        for field in [CanonicalField::BirthDate, CanonicalField::LastPurchaseDate] {
            normalize_field(row, &mut fields, field, &mut warnings, normalize_date);
        }
        normalize_field(row, &mut fields, CanonicalField::Email, &mut warnings, normalize_email);
        normalize_field(
            row,
            &mut fields,
            CanonicalField::LastPurchaseValue,
            &mut warnings,
            normalize_decimal,
        );
        if let Some(state) = fields.get(CanonicalField::State).map(str::to_uppercase) {
            fields.set(CanonicalField::State, state);
        }

        Ok((
            ContactRecord {
                phone_key,
                fields,
                custom_fields,
            },
            warnings,
        ))
    }
}

/// 市外局番なしの加入者番号の桁数。
const LOCAL_NUMBER_DIGITS: std::ops::RangeInclusive<usize> = 8..=9;

/// 分割電話モードで市外局番を前置する。電話セルが加入者番号だけのときに限り、
/// 市外局番や国番号を既に含む番号はそのまま返す。
fn with_area_code(area_code: &str, raw_phone: &str) -> String {
    if area_code.is_empty() {
        return raw_phone.to_string();
    }
    let digits = raw_phone
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>();
    if LOCAL_NUMBER_DIGITS.contains(&digits.trim_start_matches('0').len()) {
        format!("{area_code}{raw_phone}")
    } else {
        raw_phone.to_string()
    }
}

/// 正規化に失敗したフィールドは空にして警告を積む。
fn normalize_field(
    row: u64,
    fields: &mut CanonicalFields,
    field: CanonicalField,
    warnings: &mut Vec<ValidationWarning>,
    normalize: fn(&str) -> Option<String>,
) {
    let Some(raw) = fields.get(field).map(str::to_string) else {
        return;
    };
    if let Some(value) = normalize(&raw) {
        fields.set(field, value);
    } else {
        warnings.push(ValidationWarning::new(
            row,
            Some(field.as_str()),
            format!("invalid {field} '{raw}'; field left empty"),
        ));
        fields.clear(field);
    }
}

/// 受理する日付書式のいずれかで解釈し、`YYYY-MM-DD` に揃える。
fn normalize_date(raw: &str) -> Option<String> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
}

fn normalize_email(raw: &str) -> Option<String> {
    let matches = EMAIL_PATTERN.as_ref().is_some_and(|re| re.is_match(raw));
    matches.then(|| raw.to_lowercase())
}

/// `1.234,56`（pt-BR）と `1,234.56`・`1234.56` を受け付け、小数点を `.` に揃える。
///
/// `,` と `.` が両方あれば後ろにある方を小数点とみなし、もう一方は3桁区切りとして検証する。
/// 片方だけなら `,` は小数点、`.` は1つなら小数点、複数なら3桁区切り。
fn normalize_decimal(raw: &str) -> Option<String> {
    let compact: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let (sign, unsigned) = match compact.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", compact.as_str()),
    };

    let decimal_sep = match (unsigned.rfind(','), unsigned.rfind('.')) {
        (Some(comma), Some(dot)) => Some(if comma > dot { ',' } else { '.' }),
        (Some(_), None) => Some(','),
        (None, Some(_)) => (unsigned.matches('.').count() == 1).then_some('.'),
        (None, None) => None,
    };
    let group_sep = if decimal_sep == Some('.') { ',' } else { '.' };

    let (integer, fraction) = match decimal_sep.and_then(|sep| unsigned.rsplit_once(sep)) {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };
    if decimal_sep.is_some_and(|sep| integer.contains(sep)) {
        return None;
    }

    let groups: Vec<&str> = integer.split(group_sep).collect();
    let grouping_ok = groups.len() == 1
        || ((1..=3).contains(&groups[0].len()) && groups[1..].iter().all(|g| g.len() == 3));
    let is_digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
    if !grouping_ok || !groups.iter().copied().all(is_digits) || !fraction.is_none_or(is_digits) {
        return None;
    }

    let mut normalized = format!("{sign}{}", groups.concat());
    if let Some(fraction) = fraction {
        normalized.push('.');
        normalized.push_str(fraction);
    }
    Some(normalized)
}
