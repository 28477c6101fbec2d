//! Field rules for the contact form

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Services offered on the site; matched exactly, case included
pub const VALID_SERVICES: [&str; 5] = [
    "Limpeza de Sofás",
    "Higienização de Colchões",
    "Limpeza de Poltronas",
    "Tratamento Antiácaro",
    "Estofados Automotivos",
];

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;

pub const MSG_NAME_REQUIRED: &str = "Nome é obrigatório";
pub const MSG_NAME_LENGTH: &str = "Nome deve ter entre 2 e 50 caracteres";
pub const MSG_NAME_LETTERS: &str = "Nome deve conter apenas letras";
pub const MSG_PHONE_REQUIRED: &str = "Telefone é obrigatório";
pub const MSG_PHONE_FORMAT: &str = "Formato de telefone inválido";
pub const MSG_SERVICE_INVALID: &str = "Serviço selecionado é inválido";

/// Accented letters accepted in names besides A-Z (pt-BR alphabet)
const PT_BR_ACCENTED: &str = "ÃÁÀÂÄÇÉÊËÍÏÕÓÔÖÚÜãáàâäçéêëíïõóôöúü";

/// Outcome of validating one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Contact form validator
///
/// Every field is checked; errors are collected in the order name, phone,
/// service, with at most one message per field.
pub struct ContactValidator;

impl ContactValidator {
    /// Validate the sanitized form fields
    pub fn validate(fields: &Map<String, Value>) -> ValidationResult {
        let errors: Vec<String> = [
            Self::check_name(fields.get("nome")),
            Self::check_phone(fields.get("telefone")),
            Self::check_service(fields.get("servico")),
        ]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();

        debug!("Contact form validated with {} error(s)", errors.len());
        ValidationResult::from_errors(errors)
    }

    /// Presence, then length, then alphabet; only the first failure is reported
    pub fn check_name(value: Option<&Value>) -> Option<&'static str> {
        let name = match non_empty_str(value) {
            Some(name) => name,
            None => return Some(MSG_NAME_REQUIRED),
        };

        let length = name.chars().count();
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&length) {
            return Some(MSG_NAME_LENGTH);
        }

        let letters_only = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .all(is_pt_br_letter);
        // a name made only of whitespace has no letters at all
        if !letters_only || name.trim().is_empty() {
            return Some(MSG_NAME_LETTERS);
        }

        None
    }

    pub fn check_phone(value: Option<&Value>) -> Option<&'static str> {
        let phone = match non_empty_str(value) {
            Some(phone) => phone,
            None => return Some(MSG_PHONE_REQUIRED),
        };

        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        if is_br_mobile_phone(&digits) {
            None
        } else {
            Some(MSG_PHONE_FORMAT)
        }
    }

    pub fn check_service(value: Option<&Value>) -> Option<&'static str> {
        match value.and_then(Value::as_str) {
            Some(service) if VALID_SERVICES.contains(&service) => None,
            _ => Some(MSG_SERVICE_INVALID),
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// ASCII letters plus the accented letters of Brazilian Portuguese
pub fn is_pt_br_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || PT_BR_ACCENTED.contains(c)
}

/// Brazilian phone number shape over a digits-only string.
///
/// Accepted: an optional `55` country code or `0` trunk prefix, a two-digit
/// area code (digits 1-9), then either an 8-digit number or a 9-digit mobile
/// number starting with `9` followed by a non-zero digit.
pub fn is_br_mobile_phone(digits: &str) -> bool {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let mut subscribers = Vec::with_capacity(3);
    if let Some(rest) = digits.strip_prefix("55") {
        subscribers.extend(strip_area_code(rest));
    }
    if let Some(rest) = digits.strip_prefix('0') {
        subscribers.extend(strip_area_code(rest));
    }
    subscribers.extend(strip_area_code(digits));

    subscribers.into_iter().any(is_subscriber_number)
}

fn strip_area_code(digits: &str) -> Option<&str> {
    let area = digits.get(..2)?;
    if area.bytes().all(|b| (b'1'..=b'9').contains(&b)) {
        Some(&digits[2..])
    } else {
        None
    }
}

fn is_subscriber_number(number: &str) -> bool {
    let bytes = number.as_bytes();
    match bytes.len() {
        8 => true,
        9 => bytes[0] == b'9' && bytes[1] != b'0',
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn valid_form() -> Map<String, Value> {
        fields(json!({
            "nome": "João Silva",
            "telefone": "(11) 99999-9999",
            "servico": "Limpeza de Sofás"
        }))
    }

    #[test]
    fn test_valid_submission() {
        let result = ContactValidator::validate(&valid_form());
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_missing_phone_and_service() {
        let result = ContactValidator::validate(&fields(json!({"nome": "João"})));
        assert!(!result.valid);
        assert_eq!(result.errors, vec![MSG_PHONE_REQUIRED, MSG_SERVICE_INVALID]);
    }

    #[test]
    fn test_all_fields_missing_keeps_order() {
        let result = ContactValidator::validate(&Map::new());
        assert_eq!(
            result.errors,
            vec![MSG_NAME_REQUIRED, MSG_PHONE_REQUIRED, MSG_SERVICE_INVALID]
        );
    }

    #[test]
    fn test_name_rules() {
        let check = |v: Value| ContactValidator::check_name(Some(&v));
        assert_eq!(check(json!("")), Some(MSG_NAME_REQUIRED));
        assert_eq!(check(json!(42)), Some(MSG_NAME_REQUIRED));
        assert_eq!(check(json!("A")), Some(MSG_NAME_LENGTH));
        assert_eq!(check(json!("a".repeat(51))), Some(MSG_NAME_LENGTH));
        assert_eq!(check(json!("a".repeat(50))), None);
        assert_eq!(check(json!("Jo")), None);
        assert_eq!(check(json!("R2D2")), Some(MSG_NAME_LETTERS));
        assert_eq!(check(json!("Ana-Maria")), Some(MSG_NAME_LETTERS));
        assert_eq!(check(json!("   ")), Some(MSG_NAME_LETTERS));
        assert_eq!(check(json!("Conceição Araújo")), None);
        assert_eq!(check(json!("ÂNGELA ÇÖÏ")), None);
        assert_eq!(ContactValidator::check_name(None), Some(MSG_NAME_REQUIRED));
    }

    #[test]
    fn test_name_length_counts_characters() {
        // 50 accented characters are 100 bytes but still within range
        assert_eq!(ContactValidator::check_name(Some(&json!("ã".repeat(50)))), None);
    }

    #[test]
    fn test_name_error_is_exclusive() {
        let mut form = valid_form();
        form.insert("nome".into(), json!("X"));
        let result = ContactValidator::validate(&form);
        assert_eq!(result.errors, vec![MSG_NAME_LENGTH]);
    }

    #[test]
    fn test_phone_shapes() {
        assert!(is_br_mobile_phone("11999999999"));
        assert!(is_br_mobile_phone("1133334444"));
        assert!(is_br_mobile_phone("5511987654321"));
        assert!(is_br_mobile_phone("011987654321"));
        assert!(!is_br_mobile_phone("123456789"));
        assert!(!is_br_mobile_phone("11099999999"));
        assert!(!is_br_mobile_phone("00999999999"));
        // trunk prefix plus area code 19 and an 8-digit number
        assert!(is_br_mobile_phone("01999999999"));
        assert!(!is_br_mobile_phone(""));
        assert!(!is_br_mobile_phone("119999999999999"));
    }

    #[test]
    fn test_phone_error_independent_of_other_fields() {
        let result = ContactValidator::validate(&fields(json!({
            "nome": "J",
            "telefone": "123456789",
            "servico": "nope"
        })));
        assert_eq!(result.errors, vec![MSG_NAME_LENGTH, MSG_PHONE_FORMAT, MSG_SERVICE_INVALID]);

        let mut form = valid_form();
        form.insert("telefone".into(), json!("123456789"));
        assert_eq!(ContactValidator::validate(&form).errors, vec![MSG_PHONE_FORMAT]);
    }

    #[test]
    fn test_service_is_case_sensitive() {
        let check = |v: Value| ContactValidator::check_service(Some(&v));
        assert_eq!(check(json!("limpeza de sofás")), Some(MSG_SERVICE_INVALID));
        assert_eq!(check(json!("Impermeabilização")), Some(MSG_SERVICE_INVALID));
        assert_eq!(check(json!(["Limpeza de Sofás"])), Some(MSG_SERVICE_INVALID));
        for service in VALID_SERVICES {
            assert_eq!(check(json!(service)), None);
        }
    }
}
