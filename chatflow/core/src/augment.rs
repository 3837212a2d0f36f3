//! Synthetic Contact Fields
//!
//! Every response must carry a way to reach the respondent. When the author
//! did not ask for an email or a phone number, [`augment`] puts required
//! contact questions in front of the author's fields. The result is a
//! snapshot: editing the form afterwards does not change a running session.

use serde::Serialize;

use crate::field::{label_mentions_phone, Field, FieldType, REQUIRED_EMAIL_ID, REQUIRED_PHONE_ID};

/// The ordered field list a session actually walks through
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EffectiveFieldList {
    fields: Vec<Field>,
    #[serde(skip)]
    synthetic: usize,
}

impl EffectiveFieldList {
    /// Use `fields` as the traversal order without injecting anything
    ///
    /// For lists that were augmented earlier and stored, or for callers
    /// that deliberately skip the contact questions.
    #[must_use]
    pub fn verbatim(fields: Vec<Field>) -> Self {
        Self {
            fields,
            synthetic: 0,
        }
    }

    /// Number of fields to traverse
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there is nothing to traverse
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Iterate in traversal order
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// Position of the field with `id`
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    /// Number of injected contact fields (0, 1 or 2)
    #[must_use]
    pub fn synthetic_count(&self) -> usize {
        self.synthetic
    }

    /// Whether the field at `index` was injected
    #[must_use]
    pub fn is_synthetic(&self, index: usize) -> bool {
        index < self.synthetic
    }

    /// The author's own fields, without injected ones
    #[must_use]
    pub fn author_fields(&self) -> &[Field] {
        &self.fields[self.synthetic..]
    }

    /// All fields as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[Field] {
        &self.fields
    }
}

impl<'a> IntoIterator for &'a EffectiveFieldList {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// The injected email question
#[must_use]
pub fn synthetic_email_field() -> Field {
    Field::new(REQUIRED_EMAIL_ID, FieldType::Email, "Qual é o seu email?")
        .with_placeholder("seu@email.com")
        .required()
}

/// The injected phone question
#[must_use]
pub fn synthetic_phone_field() -> Field {
    Field::new(REQUIRED_PHONE_ID, FieldType::Text, "Qual é o seu telefone?")
        .with_placeholder("(00) 00000-0000")
        .required()
}

/// Derive the effective field list from the author's fields
///
/// Email and phone presence are checked independently. When both are
/// missing the list starts `[phone, email, ...]`.
#[must_use]
pub fn augment(author_fields: &[Field]) -> EffectiveFieldList {
    let has_email = author_fields
        .iter()
        .any(|f| f.field_type == FieldType::Email);
    let has_phone = author_fields.iter().any(|f| label_mentions_phone(&f.label));

    let mut fields = Vec::with_capacity(author_fields.len() + 2);
    if !has_phone {
        fields.push(synthetic_phone_field());
    }
    if !has_email {
        fields.push(synthetic_email_field());
    }
    let synthetic = fields.len();
    fields.extend_from_slice(author_fields);

    tracing::debug!(
        author_fields = author_fields.len(),
        synthetic,
        "Augmented field list"
    );

    EffectiveFieldList { fields, synthetic }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ids(list: &EffectiveFieldList) -> Vec<&str> {
        list.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_both_present_is_unchanged() {
        let author = vec![
            Field::new("mail", FieldType::Email, "Seu email"),
            Field::new("tel", FieldType::Text, "Telefone"),
        ];
        let list = augment(&author);

        assert_eq!(list.as_slice(), author.as_slice());
        assert_eq!(list.synthetic_count(), 0);
    }

    #[test]
    fn test_neither_present_prepends_phone_then_email() {
        let author = vec![
            Field::new("f1", FieldType::Text, "Nome").required(),
            Field::new("f2", FieldType::Textarea, "Comentários"),
        ];
        let list = augment(&author);

        assert_eq!(ids(&list), vec![REQUIRED_PHONE_ID, REQUIRED_EMAIL_ID, "f1", "f2"]);
        assert_eq!(list.len(), author.len() + 2);
        assert!(list.is_synthetic(0));
        assert!(list.is_synthetic(1));
        assert!(!list.is_synthetic(2));
        assert_eq!(list.author_fields(), author.as_slice());
    }

    #[test]
    fn test_only_email_missing() {
        let author = vec![Field::new("tel", FieldType::Text, "Mobile PHONE")];
        let list = augment(&author);

        assert_eq!(ids(&list), vec![REQUIRED_EMAIL_ID, "tel"]);
    }

    #[test]
    fn test_only_phone_missing() {
        let author = vec![Field::new("mail", FieldType::Email, "Email")];
        let list = augment(&author);

        assert_eq!(ids(&list), vec![REQUIRED_PHONE_ID, "mail"]);
    }

    #[test]
    fn test_synthetic_fields_are_required() {
        let list = augment(&[]);

        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|f| f.required));
        assert!(list.get(0).is_some_and(Field::is_phone));
        assert_eq!(
            list.get(1).map(|f| f.field_type),
            Some(FieldType::Email)
        );
    }

    #[test]
    fn test_phone_detection_ignores_field_type() {
        // An email-typed field labelled "phone" still counts for both checks
        let author = vec![Field::new("x", FieldType::Email, "Email or phone")];
        let list = augment(&author);

        assert_eq!(list.synthetic_count(), 0);
    }

    #[test]
    fn test_index_of() {
        let list = augment(&[Field::new("f1", FieldType::Text, "Nome")]);
        assert_eq!(list.index_of("f1"), Some(2));
        assert_eq!(list.index_of("nope"), None);
    }
}
