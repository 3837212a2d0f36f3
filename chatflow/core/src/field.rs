//! Form Definitions
//!
//! The data model shared by every other module: one [`Field`] per question,
//! the [`FlowDocument`] that nests the field list inside a stored form, and
//! the read-only [`FormSource`] snapshot a filling session starts from.
//!
//! # Wire Format
//!
//! Field documents use the camelCase JSON shape the editor writes:
//!
//! ```json
//! { "id": "f1", "type": "text", "label": "Nome", "required": true, "maxLength": 80 }
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Labels containing any of these (case-insensitive) mark a phone field
const PHONE_LABEL_MARKERS: [&str; 2] = ["telefone", "phone"];

/// Id of the synthetic phone field injected by augmentation
pub const REQUIRED_PHONE_ID: &str = "required_phone";

/// Id of the synthetic email field injected by augmentation
pub const REQUIRED_EMAIL_ID: &str = "required_email";

/// Kind of answer a field collects
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Single-line free text
    Text,
    /// Multi-line free text
    Textarea,
    /// Email address
    Email,
    /// One option out of a fixed list
    Choice,
}

impl FieldType {
    /// Wire name of the type
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Email => "email",
            Self::Choice => "choice",
        }
    }

    /// Whether a `maxLength` bound means anything for this type
    #[must_use]
    pub fn supports_max_length(&self) -> bool {
        matches!(self, Self::Text | Self::Textarea)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One question in a form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Unique within the form
    pub id: String,
    /// Kind of answer collected
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Prompt shown to the respondent
    pub label: String,
    /// Whether an empty answer is rejected
    #[serde(default)]
    pub required: bool,
    /// Hint text for the input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Upper bound on answer length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Options for `choice` fields, in display order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl Field {
    /// Create an optional field with no placeholder, bound or options
    pub fn new(id: impl Into<String>, field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            field_type,
            label: label.into(),
            required: false,
            placeholder: None,
            max_length: None,
            options: Vec::new(),
        }
    }

    /// Create a field the way the editor does when a type is added
    ///
    /// Choice fields start with two placeholder options so the definition
    /// is valid immediately.
    pub fn with_defaults(id: impl Into<String>, field_type: FieldType) -> Self {
        let mut field = Self::new(id, field_type, format!("Novo campo {field_type}"));
        field.placeholder = Some(String::new());
        if field_type == FieldType::Choice {
            field.options = vec!["Opção 1".to_string(), "Opção 2".to_string()];
        }
        field
    }

    /// Mark the field as required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the placeholder
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Set the length bound
    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Set the choice options
    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this field collects a phone number
    ///
    /// True for the synthetic phone field and for any field whose label
    /// mentions "telefone" or "phone".
    #[must_use]
    pub fn is_phone(&self) -> bool {
        self.id == REQUIRED_PHONE_ID || label_mentions_phone(&self.label)
    }

    /// Check the definition invariants of a single field
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn check(&self) -> Result<(), FieldDefinitionError> {
        if self.id.trim().is_empty() {
            return Err(FieldDefinitionError::EmptyId);
        }
        if self.field_type == FieldType::Choice && self.options.is_empty() {
            return Err(FieldDefinitionError::ChoiceWithoutOptions {
                field_id: self.id.clone(),
            });
        }
        if self.field_type != FieldType::Choice && !self.options.is_empty() {
            return Err(FieldDefinitionError::OptionsOnNonChoice {
                field_id: self.id.clone(),
                field_type: self.field_type,
            });
        }
        if self.max_length == Some(0) {
            return Err(FieldDefinitionError::ZeroMaxLength {
                field_id: self.id.clone(),
            });
        }
        Ok(())
    }
}

/// Whether a label names a phone number question
pub(crate) fn label_mentions_phone(label: &str) -> bool {
    let lowered = label.to_lowercase();
    PHONE_LABEL_MARKERS.iter().any(|m| lowered.contains(m))
}

/// Check every field plus id uniqueness across the list
///
/// # Errors
///
/// Returns the first violated invariant in field order.
pub fn check_fields(fields: &[Field]) -> Result<(), FieldDefinitionError> {
    let mut seen = HashSet::with_capacity(fields.len());
    for field in fields {
        field.check()?;
        if !seen.insert(field.id.as_str()) {
            return Err(FieldDefinitionError::DuplicateId {
                field_id: field.id.clone(),
            });
        }
    }
    Ok(())
}

/// A field definition that breaks the data model invariants
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FieldDefinitionError {
    /// Field id is blank
    #[error("field id must not be empty")]
    EmptyId,

    /// Two fields share an id
    #[error("duplicate field id '{field_id}'")]
    DuplicateId {
        /// The repeated id
        field_id: String,
    },

    /// Choice field with an empty option list
    #[error("choice field '{field_id}' needs at least one option")]
    ChoiceWithoutOptions {
        /// Offending field
        field_id: String,
    },

    /// Options attached to a field that is not a choice
    #[error("field '{field_id}' of type {field_type} cannot have options")]
    OptionsOnNonChoice {
        /// Offending field
        field_id: String,
        /// Its declared type
        field_type: FieldType,
    },

    /// `maxLength` of zero
    #[error("field '{field_id}' has maxLength 0; the bound must be positive")]
    ZeroMaxLength {
        /// Offending field
        field_id: String,
    },
}

/// Publication state of a stored form
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    /// Still being edited; not reachable by respondents
    #[default]
    Draft,
    /// Open for responses
    Published,
}

/// A file offered for download alongside a form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadableFile {
    /// File id
    pub id: String,
    /// Display name
    pub name: String,
    /// Where the file is served from
    pub url: String,
    /// Size in bytes
    pub size: u64,
}

/// Look-and-feel settings of a form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormCustomization {
    /// Accent color (CSS value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    /// Page background (CSS value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Whether the help chat widget is shown
    #[serde(default = "default_chat_enabled")]
    pub chat_enabled: bool,
    /// Logo URL or data URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Files offered with the form
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub downloadable_files: Vec<DownloadableFile>,
}

fn default_chat_enabled() -> bool {
    true
}

impl Default for FormCustomization {
    fn default() -> Self {
        Self {
            primary_color: None,
            background_color: None,
            chat_enabled: true,
            logo: None,
            downloadable_files: Vec::new(),
        }
    }
}

/// The JSON "flow" document stored with a form
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDocument {
    /// Author-defined fields in order
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Presentation settings
    #[serde(default)]
    pub customization: FormCustomization,
}

/// Read-only snapshot handed to a filling session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSource {
    /// Form title
    pub title: String,
    /// Author-defined fields in order
    pub fields: Vec<Field>,
}

impl FormSource {
    /// Create a snapshot
    pub fn new(title: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            title: title.into(),
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_json_shape() {
        let field = Field::new("f1", FieldType::Text, "Nome")
            .required()
            .with_max_length(80);
        let json = serde_json::to_value(&field).unwrap();

        assert_eq!(json["type"], "text");
        assert_eq!(json["maxLength"], 80);
        assert_eq!(json["required"], true);
        assert!(json.get("options").is_none());
        assert!(json.get("placeholder").is_none());
    }

    #[test]
    fn test_field_parses_editor_document() {
        let raw = r#"{"id":"c1","type":"choice","label":"Plano","options":["A","B"]}"#;
        let field: Field = serde_json::from_str(raw).unwrap();

        assert_eq!(field.field_type, FieldType::Choice);
        assert!(!field.required);
        assert_eq!(field.options, vec!["A", "B"]);
    }

    #[test]
    fn test_phone_detection() {
        assert!(Field::new(REQUIRED_PHONE_ID, FieldType::Text, "x").is_phone());
        assert!(Field::new("a", FieldType::Text, "Seu TELEFONE").is_phone());
        assert!(Field::new("b", FieldType::Text, "Mobile phone").is_phone());
        assert!(!Field::new("c", FieldType::Text, "Nome").is_phone());
    }

    #[test]
    fn test_check_rejects_choice_without_options() {
        let field = Field::new("c", FieldType::Choice, "Pick");
        assert_eq!(
            field.check(),
            Err(FieldDefinitionError::ChoiceWithoutOptions {
                field_id: "c".to_string()
            })
        );
    }

    #[test]
    fn test_check_rejects_options_on_text() {
        let field = Field::new("t", FieldType::Text, "Nome").with_options(["x"]);
        assert!(matches!(
            field.check(),
            Err(FieldDefinitionError::OptionsOnNonChoice { .. })
        ));
    }

    #[test]
    fn test_check_rejects_zero_max_length() {
        let field = Field::new("t", FieldType::Text, "Nome").with_max_length(0);
        assert!(matches!(
            field.check(),
            Err(FieldDefinitionError::ZeroMaxLength { .. })
        ));
    }

    #[test]
    fn test_check_fields_duplicate_ids() {
        let fields = vec![
            Field::new("a", FieldType::Text, "One"),
            Field::new("a", FieldType::Email, "Two"),
        ];
        assert_eq!(
            check_fields(&fields),
            Err(FieldDefinitionError::DuplicateId {
                field_id: "a".to_string()
            })
        );
    }

    #[test]
    fn test_editor_defaults() {
        let choice = Field::with_defaults("c", FieldType::Choice);
        assert_eq!(choice.label, "Novo campo choice");
        assert_eq!(choice.options.len(), 2);
        assert!(choice.check().is_ok());

        let text = Field::with_defaults("t", FieldType::Textarea);
        assert!(text.options.is_empty());
        assert!(!text.required);
    }

    #[test]
    fn test_customization_defaults_chat_enabled() {
        let flow: FlowDocument = serde_json::from_str(r#"{"fields":[]}"#).unwrap();
        assert!(flow.customization.chat_enabled);

        let custom: FormCustomization = serde_json::from_str("{}").unwrap();
        assert!(custom.chat_enabled);
    }
}
