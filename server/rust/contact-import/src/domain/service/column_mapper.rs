use std::collections::HashSet;

use crate::domain::entity::{ColumnAssignment, ColumnMapping, ColumnTarget};
use crate::domain::value_object::CanonicalField;

/// AliasTarget はエイリアス表の割り当て先。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AliasTarget {
    Field(CanonicalField),
    AreaCode,
}

/// 正規化済みヘッダーに対するエイリアス表。上から順に評価し、最初の一致を採用する。
const ALIAS_TABLE: &[(&[&str], AliasTarget)] = &[
    (
        &["nome", "name", "nome_completo", "full_name", "contato", "cliente"],
        AliasTarget::Field(CanonicalField::Name),
    ),
    (
        &[
            "telefone",
            "celular",
            "phone",
            "whatsapp",
            "fone",
            "tel",
            "mobile",
            "phone_number",
            "telefone_celular",
            "numero",
        ],
        AliasTarget::Field(CanonicalField::Phone),
    ),
    (
        &["email", "e_mail", "mail", "correio_eletronico"],
        AliasTarget::Field(CanonicalField::Email),
    ),
    (
        &[
            "data_nascimento",
            "data_de_nascimento",
            "nascimento",
            "aniversario",
            "birth_date",
            "birthday",
            "dob",
        ],
        AliasTarget::Field(CanonicalField::BirthDate),
    ),
    (
        &["cidade", "city", "municipio"],
        AliasTarget::Field(CanonicalField::City),
    ),
    (
        &["estado", "uf", "state"],
        AliasTarget::Field(CanonicalField::State),
    ),
    (
        &["indicado_por", "indicacao", "referred_by", "referral"],
        AliasTarget::Field(CanonicalField::ReferredBy),
    ),
    (
        &["observacoes", "observacao", "obs", "notas", "notes", "anotacoes"],
        AliasTarget::Field(CanonicalField::Notes),
    ),
    (
        &[
            "data_compra",
            "data_ultima_compra",
            "ultima_compra",
            "last_purchase_date",
            "purchase_date",
        ],
        AliasTarget::Field(CanonicalField::LastPurchaseDate),
    ),
    (
        &[
            "valor_compra",
            "valor_ultima_compra",
            "last_purchase_value",
            "purchase_value",
        ],
        AliasTarget::Field(CanonicalField::LastPurchaseValue),
    ),
    (
        &[
            "ddd",
            "area_code",
            "codigo_area",
            "codigo_de_area",
            "cod_area",
            "prefixo",
        ],
        AliasTarget::AreaCode,
    ),
];

/// ColumnMapper はヘッダー列を正規フィールドへ対応付ける。ヘッダーと分割電話フラグのみの純粋関数。
pub struct ColumnMapper;

impl ColumnMapper {
    pub fn map_headers(headers: &[String], split_phone: bool) -> ColumnMapping {
        let mut taken: HashSet<AliasTarget> = HashSet::new();
        let assignments = headers
            .iter()
            .map(|header| {
                let target = match lookup(&normalize_header(header)) {
                    Some(AliasTarget::AreaCode) if !split_phone => ColumnTarget::Custom,
                    Some(alias) if taken.insert(alias) => match alias {
                        AliasTarget::Field(field) => ColumnTarget::Field(field),
                        AliasTarget::AreaCode => ColumnTarget::AreaCode,
                    },
                    // 同じフィールドへの2列目以降はデータを失わないようカスタム扱い
                    Some(_) | None => ColumnTarget::Custom,
                };
                ColumnAssignment {
                    header: header.clone(),
                    target,
                }
            })
            .collect();
        ColumnMapping::new(assignments)
    }

    pub fn is_phone_header(header: &str) -> bool {
        lookup(&normalize_header(header)) == Some(AliasTarget::Field(CanonicalField::Phone))
    }

    pub fn is_area_code_header(header: &str) -> bool {
        lookup(&normalize_header(header)) == Some(AliasTarget::AreaCode)
    }
}

fn lookup(normalized: &str) -> Option<AliasTarget> {
    ALIAS_TABLE
        .iter()
        .find(|(aliases, _)| aliases.contains(&normalized))
        .map(|(_, target)| *target)
}

/// ヘッダーを比較用に正規化する。
///
/// 前後空白を除去して小文字化し、ラテン文字の発音区別符号を落とし、
/// 空白・`-`・`.`・`_` の連続を1つの `_` にまとめる。
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.trim().chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() || matches!(c, '-' | '.' | '_') {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.push(fold_diacritic(c));
    }
    out
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Nome  "), "nome");
        assert_eq!(normalize_header("E-mail"), "e_mail");
        assert_eq!(normalize_header("Data de Nascimento"), "data_de_nascimento");
        assert_eq!(normalize_header("Observações"), "observacoes");
        assert_eq!(normalize_header("Código  de.Área"), "codigo_de_area");
        assert_eq!(normalize_header("-ddd-"), "ddd");
    }

    #[test]
    fn test_map_headers_known_and_custom() {
        let mapping = ColumnMapper::map_headers(&headers(&["Nome", "phone", "Valor"]), false);
        let targets: Vec<ColumnTarget> = mapping.assignments().iter().map(|a| a.target).collect();
        assert_eq!(
            targets,
            vec![
                ColumnTarget::Field(CanonicalField::Name),
                ColumnTarget::Field(CanonicalField::Phone),
                ColumnTarget::Custom,
            ]
        );
        assert_eq!(mapping.assignments()[2].header, "Valor");
    }

    #[test]
    fn test_map_headers_is_deterministic() {
        let input = headers(&[
            "Celular",
            "E-mail",
            "Cidade",
            "UF",
            "Valor Compra",
            "Time do coração",
            "WhatsApp",
        ]);
        let first = ColumnMapper::map_headers(&input, false);
        let second = ColumnMapper::map_headers(&input, false);
        assert_eq!(first, second);
        assert_eq!(
            first.target_at(4),
            ColumnTarget::Field(CanonicalField::LastPurchaseValue)
        );
    }

    #[test]
    fn test_duplicate_field_becomes_custom() {
        let mapping = ColumnMapper::map_headers(&headers(&["Celular", "WhatsApp"]), false);
        assert_eq!(mapping.target_at(0), ColumnTarget::Field(CanonicalField::Phone));
        assert_eq!(mapping.target_at(1), ColumnTarget::Custom);
        assert_eq!(mapping.phone_index(), Some(0));
    }

    #[test]
    fn test_area_code_requires_split_flag() {
        let input = headers(&["DDD", "Telefone"]);
        assert_eq!(
            ColumnMapper::map_headers(&input, true).target_at(0),
            ColumnTarget::AreaCode
        );
        assert_eq!(
            ColumnMapper::map_headers(&input, false).target_at(0),
            ColumnTarget::Custom
        );
    }

    #[test]
    fn test_header_predicates() {
        assert!(ColumnMapper::is_phone_header(" Telefone "));
        assert!(ColumnMapper::is_area_code_header("Cód. Área"));
        assert!(!ColumnMapper::is_phone_header("Valor"));
    }
}
