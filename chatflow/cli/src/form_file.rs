//! Form document loading
//!
//! Accepts either a bare `{title, fields}` snapshot or a stored form
//! document with its `flow`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use chatflow_core::{FormCustomization, FormDocument, FormSource};

#[derive(Deserialize)]
#[serde(untagged)]
enum FormFile {
    Stored(FormDocument),
    Snapshot(FormSource),
}

/// A form ready to be filled
#[derive(Debug)]
pub struct LoadedForm {
    /// Id responses are filed under
    pub form_id: String,
    /// Title and fields
    pub source: FormSource,
    /// Look-and-feel settings; defaults for bare snapshots
    pub customization: FormCustomization,
}

/// Parse a form file's contents
///
/// `fallback_id` is used for snapshots, which carry no id. Draft documents
/// are refused.
pub fn parse_form(json: &str, fallback_id: &str) -> Result<LoadedForm> {
    let file: FormFile = serde_json::from_str(json)
        .context("Not a form document ({title, fields} or a stored form)")?;

    match file {
        FormFile::Stored(doc) => {
            if !doc.is_published() {
                bail!("Form '{}' is not published", doc.name);
            }
            Ok(LoadedForm {
                source: doc.source(),
                form_id: doc.id,
                customization: doc.flow.customization,
            })
        }
        FormFile::Snapshot(source) => Ok(LoadedForm {
            form_id: fallback_id.to_string(),
            source,
            customization: FormCustomization::default(),
        }),
    }
}

/// Read and parse a form file
pub async fn load_form(path: &Path) -> Result<LoadedForm> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read form file: {}", path.display()))?;
    let fallback_id = path
        .file_stem()
        .map_or_else(|| "form".to_string(), |s| s.to_string_lossy().into_owned());

    let form = parse_form(&json, &fallback_id)
        .with_context(|| format!("Invalid form file: {}", path.display()))?;
    tracing::debug!(form_id = %form.form_id, fields = form.source.fields.len(), "Form loaded");
    Ok(form)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_snapshot() {
        let form = parse_form(
            r#"{"title":"Cadastro","fields":[{"id":"f1","type":"text","label":"Nome","required":true}]}"#,
            "cadastro",
        )
        .unwrap();
        assert_eq!(form.form_id, "cadastro");
        assert_eq!(form.source.title, "Cadastro");
        assert!(form.source.fields[0].required);
        assert!(form.customization.chat_enabled);
    }

    #[test]
    fn test_parse_published_document() {
        let form = parse_form(
            r#"{
                "id": "42",
                "ownerId": "alice",
                "name": "Pesquisa",
                "status": "published",
                "flow": {
                    "fields": [{"id":"p","type":"choice","label":"Plano","options":["A","B"]}],
                    "customization": {"chatEnabled": false}
                },
                "createdAt": "2024-05-01T12:00:00Z",
                "updatedAt": "2024-05-01T12:00:00Z"
            }"#,
            "ignored",
        )
        .unwrap();
        assert_eq!(form.form_id, "42");
        assert_eq!(form.source.title, "Pesquisa");
        assert_eq!(form.source.fields[0].options, vec!["A", "B"]);
        assert!(!form.customization.chat_enabled);
    }

    #[test]
    fn test_draft_document_refused() {
        let err = parse_form(
            r#"{
                "id": "42", "ownerId": "alice", "name": "Rascunho",
                "createdAt": "2024-05-01T12:00:00Z", "updatedAt": "2024-05-01T12:00:00Z"
            }"#,
            "x",
        )
        .unwrap_err();
        assert!(err.to_string().contains("not published"));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse_form(r#"{"hello": 1}"#, "x").is_err());
    }
}
