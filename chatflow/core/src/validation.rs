//! Field Validation
//!
//! Pure checks of one answer against one field definition. The rules run in
//! a fixed order and the first one that fires is the only error reported:
//!
//! 1. required field left empty (whitespace counts as empty)
//! 2. malformed email on an `email` field
//! 3. malformed phone number on a phone field
//! 4. answer longer than `maxLength`
//!
//! Rules 2-4 only look at non-empty answers, so an optional field may always
//! be skipped.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::{Field, FieldType};

/// Minimum length of a phone answer after trimming
pub const MIN_PHONE_LENGTH: usize = 10;

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

static PHONE_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\d\s()\-+]+$").expect("phone pattern compiles")
});

/// Why an answer was rejected
///
/// The `Display` text is the inline message shown next to the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(tag = "code", content = "limit", rename_all = "snake_case")]
pub enum ValidationError {
    /// Required field is empty or whitespace
    #[error("Este campo é obrigatório")]
    RequiredFieldEmpty,
    /// Email answer without `local@domain.tld` shape
    #[error("Email inválido")]
    InvalidEmailFormat,
    /// Phone answer with foreign characters or too short
    #[error("Telefone inválido")]
    InvalidPhoneFormat,
    /// Answer longer than the field's bound (the bound is carried)
    #[error("Máximo de {0} caracteres")]
    MaxLengthExceeded(usize),
}

impl ValidationError {
    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RequiredFieldEmpty => "required_field_empty",
            Self::InvalidEmailFormat => "invalid_email_format",
            Self::InvalidPhoneFormat => "invalid_phone_format",
            Self::MaxLengthExceeded(_) => "max_length_exceeded",
        }
    }
}

/// Validate one answer against one field
///
/// Returns `None` when the answer is acceptable.
#[must_use]
pub fn validate(field: &Field, value: &str) -> Option<ValidationError> {
    let trimmed = value.trim();

    if field.required && trimmed.is_empty() {
        return Some(ValidationError::RequiredFieldEmpty);
    }

    // Shape rules see a whitespace-only optional answer as non-empty.
    if value.is_empty() {
        return None;
    }

    if field.field_type == FieldType::Email && !is_email(trimmed) {
        return Some(ValidationError::InvalidEmailFormat);
    }

    if field.is_phone() && !is_phone_number(trimmed) {
        return Some(ValidationError::InvalidPhoneFormat);
    }

    if let Some(limit) = field.max_length {
        if value.chars().count() > limit {
            return Some(ValidationError::MaxLengthExceeded(limit));
        }
    }

    None
}

/// Validate every field of a single-page form at once
///
/// Fields without an entry in `values` are treated as empty. Only failing
/// fields appear in the result.
#[must_use]
pub fn validate_all(
    fields: &[Field],
    values: &BTreeMap<String, String>,
) -> BTreeMap<String, ValidationError> {
    fields
        .iter()
        .filter_map(|field| {
            let value = values.get(&field.id).map_or("", String::as_str);
            validate(field, value).map(|err| (field.id.clone(), err))
        })
        .collect()
}

/// Whether `value` has the `local@domain.tld` shape
#[must_use]
pub fn is_email(value: &str) -> bool {
    EMAIL_SHAPE.is_match(value)
}

/// Whether `value` is made of phone characters and is long enough
#[must_use]
pub fn is_phone_number(value: &str) -> bool {
    PHONE_CHARSET.is_match(value) && value.chars().count() >= MIN_PHONE_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::REQUIRED_PHONE_ID;

    fn text(required: bool) -> Field {
        let field = Field::new("t", FieldType::Text, "Nome");
        if required {
            field.required()
        } else {
            field
        }
    }

    fn email() -> Field {
        Field::new("e", FieldType::Email, "Email")
    }

    fn phone() -> Field {
        Field::new(REQUIRED_PHONE_ID, FieldType::Text, "Qual é o seu telefone?").required()
    }

    #[test]
    fn test_required_rejects_empty_and_whitespace() {
        for value in ["", " ", "\t\n  "] {
            assert_eq!(
                validate(&text(true), value),
                Some(ValidationError::RequiredFieldEmpty),
                "value {value:?}"
            );
        }
    }

    #[test]
    fn test_optional_empty_passes() {
        assert_eq!(validate(&text(false), ""), None);
        assert_eq!(validate(&email(), ""), None);
    }

    #[test]
    fn test_required_short_circuits_other_rules() {
        let field = Field::new("e", FieldType::Email, "Telefone ou email").required();
        assert_eq!(
            validate(&field, "   "),
            Some(ValidationError::RequiredFieldEmpty)
        );
    }

    #[test]
    fn test_email_shapes() {
        assert_eq!(validate(&email(), "a@b.co"), None);
        assert_eq!(validate(&email(), "  ana@example.com.br "), None);
        for bad in ["bad", "a@b", "@b.co", "a b@c.co", "a@@b.co"] {
            assert_eq!(
                validate(&email(), bad),
                Some(ValidationError::InvalidEmailFormat),
                "value {bad:?}"
            );
        }
    }

    #[test]
    fn test_phone_shapes() {
        assert_eq!(
            validate(&phone(), "12345"),
            Some(ValidationError::InvalidPhoneFormat)
        );
        assert_eq!(validate(&phone(), "(11) 91234-5678"), None);
        assert_eq!(validate(&phone(), "+55 11 99999 8888"), None);
        assert_eq!(validate(&phone(), "11999998888"), None);
        assert_eq!(
            validate(&phone(), "11-9999-abcd"),
            Some(ValidationError::InvalidPhoneFormat)
        );
    }

    #[test]
    fn test_phone_detected_by_label() {
        let field = Field::new("p", FieldType::Text, "Telefone para contato");
        assert_eq!(
            validate(&field, "123"),
            Some(ValidationError::InvalidPhoneFormat)
        );
    }

    #[test]
    fn test_max_length_boundary() {
        let field = text(false).with_max_length(3);
        assert_eq!(validate(&field, "abc"), None);
        assert_eq!(
            validate(&field, "abcd"),
            Some(ValidationError::MaxLengthExceeded(3))
        );
    }

    #[test]
    fn test_max_length_counts_characters() {
        let field = text(false).with_max_length(4);
        assert_eq!(validate(&field, "ação"), None);
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ValidationError::RequiredFieldEmpty.to_string(),
            "Este campo é obrigatório"
        );
        assert_eq!(
            ValidationError::MaxLengthExceeded(20).to_string(),
            "Máximo de 20 caracteres"
        );
        assert_eq!(
            ValidationError::InvalidEmailFormat.code(),
            "invalid_email_format"
        );
    }

    #[test]
    fn test_validate_all_reports_every_failure() {
        let short = Field::new("short", FieldType::Textarea, "Resumo").with_max_length(2);
        let fields = vec![text(true), email(), short];

        let mut values = BTreeMap::new();
        values.insert("e".to_string(), "nope".to_string());
        values.insert("short".to_string(), "long".to_string());

        let errors = validate_all(&fields, &values);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors["t"], ValidationError::RequiredFieldEmpty);
        assert_eq!(errors["e"], ValidationError::InvalidEmailFormat);
        assert_eq!(errors["short"], ValidationError::MaxLengthExceeded(2));
    }
}
