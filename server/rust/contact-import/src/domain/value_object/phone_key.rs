use serde::{Deserialize, Serialize};

/// PhoneError は電話番号を識別キーへ正規化できなかった理由を表す。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("phone has no digits: '{0}'")]
    NoDigits(String),

    #[error("phone '{raw}' has {digits} digits after country code prefixing, expected {min}-{max}")]
    InvalidLength {
        raw: String,
        digits: usize,
        min: usize,
        max: usize,
    },
}

/// PhonePolicy は正規化に使う国番号と桁数範囲。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonePolicy {
    pub country_code: String,
    pub min_digits: usize,
    pub max_digits: usize,
}

impl Default for PhonePolicy {
    fn default() -> Self {
        Self {
            country_code: "55".to_string(),
            min_digits: 10,
            max_digits: 15,
        }
    }
}

/// PhoneKey は国番号付き数字列に正規化された電話番号。重複判定の唯一のキー。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneKey(String);

impl PhoneKey {
    /// 生の電話番号文字列を正規化する。
    ///
    /// 数字以外を除去し、先頭のトランクプレフィックス `0` を落とし、
    /// 国番号で始まっていなければ付与したうえで桁数を検証する。
    pub fn normalize(raw: &str, policy: &PhonePolicy) -> Result<Self, PhoneError> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Err(PhoneError::NoDigits(raw.to_string()));
        }

        let key = if digits.starts_with(&policy.country_code) {
            digits.to_string()
        } else {
            format!("{}{}", policy.country_code, digits)
        };

        if key.len() < policy.min_digits || key.len() > policy.max_digits {
            return Err(PhoneError::InvalidLength {
                raw: raw.to_string(),
                digits: key.len(),
                min: policy.min_digits,
                max: policy.max_digits,
            });
        }

        Ok(Self(key))
    }

    /// 永続化済みの正規化値から復元する。
    pub fn from_normalized(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn br() -> PhonePolicy {
        PhonePolicy::default()
    }

    #[test]
    fn test_equivalent_spellings_share_key() {
        let a = PhoneKey::normalize("(11) 99999-9999", &br()).unwrap();
        let b = PhoneKey::normalize("11999999999", &br()).unwrap();
        let c = PhoneKey::normalize("+5511999999999", &br()).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "5511999999999");
    }

    #[test]
    fn test_trunk_zero_is_dropped() {
        let key = PhoneKey::normalize("011 98888-7777", &br()).unwrap();
        assert_eq!(key.as_str(), "5511988887777");
    }

    #[test]
    fn test_no_digits_is_error() {
        let err = PhoneKey::normalize("not-a-phone", &br()).unwrap_err();
        assert!(matches!(err, PhoneError::NoDigits(_)));
        assert!(PhoneKey::normalize("", &br()).is_err());
    }

    #[test]
    fn test_too_short_after_prefixing() {
        let err = PhoneKey::normalize("1234", &br()).unwrap_err();
        assert!(matches!(err, PhoneError::InvalidLength { digits: 6, .. }));
    }

    #[test]
    fn test_too_long() {
        let err = PhoneKey::normalize("+55 11 99999 9999 12345", &br()).unwrap_err();
        assert!(matches!(err, PhoneError::InvalidLength { .. }));
    }

    #[test]
    fn test_other_country_code() {
        let policy = PhonePolicy {
            country_code: "1".to_string(),
            ..PhonePolicy::default()
        };
        let key = PhoneKey::normalize("(415) 555-0100", &policy).unwrap();
        assert_eq!(key.as_str(), "14155550100");
    }
}
