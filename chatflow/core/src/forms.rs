//! Form Management
//!
//! Authoring side of ChatFlow: owners create forms, edit their fields,
//! publish them, and read the responses respondents leave.
//!
//! # Design Philosophy
//!
//! Forms are owned. Every authoring call names the owner and is refused
//! with [`FormError::Forbidden`] when it does not match. The two public
//! entry points, [`FormService::public_form`] and
//! [`FormService::record_response`], take no owner and only work on
//! published forms.
//!
//! Storage goes through [`Repository`], so the service runs the same
//! against the in-memory map used in tests and the CLI or a database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::{
    check_fields, Field, FieldDefinitionError, FieldType, FlowDocument, FormCustomization,
    FormSource, FormStatus,
};
use crate::ids::{IdGenerator, UuidIds};
use crate::repository::{Entity, InMemoryRepository, Repository, RepositoryError};
use crate::sink::{Ack, ResponseSink, SubmissionError};
use crate::traversal::Answers;

/// A stored form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDocument {
    /// Form id
    pub id: String,
    /// Author who owns it
    pub owner_id: String,
    /// Form name, shown to respondents as the title
    pub name: String,
    /// Publication state
    #[serde(default)]
    pub status: FormStatus,
    /// Fields and customization
    #[serde(default)]
    pub flow: FlowDocument,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl FormDocument {
    /// Whether respondents may fill it
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == FormStatus::Published
    }

    /// Snapshot handed to a filling session
    #[must_use]
    pub fn source(&self) -> FormSource {
        FormSource::new(self.name.clone(), self.flow.fields.clone())
    }
}

impl Entity for FormDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

/// One respondent's answers to one form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    /// Response id
    pub id: String,
    /// Form answered
    pub form_id: String,
    /// Answers keyed by field id
    pub data: Answers,
    /// When the answers were recorded
    pub submitted_at: DateTime<Utc>,
}

impl Entity for FormResponse {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Partial update of a form; `None` leaves a property alone
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormUpdate {
    /// New name
    pub name: Option<String>,
    /// New publication state
    pub status: Option<FormStatus>,
    /// Replacement field list
    pub fields: Option<Vec<Field>>,
    /// Replacement customization
    pub customization: Option<FormCustomization>,
}

/// Form management failures
#[derive(Debug, Error)]
pub enum FormError {
    /// No form with this id
    #[error("form {0} not found")]
    NotFound(String),

    /// The form belongs to someone else
    #[error("access to form {form_id} denied")]
    Forbidden {
        /// Requested form
        form_id: String,
    },

    /// The form is a draft
    #[error("form {0} is not published")]
    NotPublished(String),

    /// Publishing a form without fields
    #[error("form {0} has no fields to publish")]
    EmptyForm(String),

    /// Form name missing
    #[error("form name is required")]
    EmptyName,

    /// No field with this id on the form
    #[error("form {form_id} has no field {field_id}")]
    FieldNotFound {
        /// Form searched
        form_id: String,
        /// Missing field
        field_id: String,
    },

    /// A field definition breaks the field rules
    #[error(transparent)]
    InvalidField(#[from] FieldDefinitionError),

    /// Storage failed
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<FormError> for SubmissionError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::NotFound(form_id) => Self::FormNotFound { form_id },
            FormError::NotPublished(form_id) => Self::NotPublished { form_id },
            FormError::Repository(e) => Self::Storage(e.to_string()),
            other => Self::Rejected {
                status: 400,
                message: other.to_string(),
            },
        }
    }
}

/// Authoring and response operations over form storage
pub struct FormService {
    forms: Arc<dyn Repository<FormDocument>>,
    responses: Arc<dyn Repository<FormResponse>>,
    ids: Arc<dyn IdGenerator>,
}

impl FormService {
    /// Create a service over the given repositories
    pub fn new(
        forms: Arc<dyn Repository<FormDocument>>,
        responses: Arc<dyn Repository<FormResponse>>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            forms,
            responses,
            ids,
        }
    }

    /// Service backed by in-memory maps and random ids
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryRepository::<FormDocument>::new()),
            Arc::new(InMemoryRepository::<FormResponse>::new()),
            Arc::new(UuidIds),
        )
    }

    /// Create an empty draft form
    pub async fn create_form(&self, owner: &str, name: &str) -> Result<FormDocument, FormError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FormError::EmptyName);
        }

        let now = Utc::now();
        let form = FormDocument {
            id: self.ids.next_id(),
            owner_id: owner.to_string(),
            name: name.to_string(),
            status: FormStatus::Draft,
            flow: FlowDocument::default(),
            created_at: now,
            updated_at: now,
        };
        let form = self.forms.create(form).await?;
        tracing::info!(form_id = %form.id, owner, "Form created");
        Ok(form)
    }

    /// Fetch a form its owner is editing
    pub async fn get_form(&self, owner: &str, form_id: &str) -> Result<FormDocument, FormError> {
        let form = self
            .forms
            .get(form_id)
            .await?
            .ok_or_else(|| FormError::NotFound(form_id.to_string()))?;

        if form.owner_id != owner {
            tracing::warn!(form_id, owner, "Form access denied");
            return Err(FormError::Forbidden {
                form_id: form_id.to_string(),
            });
        }
        Ok(form)
    }

    /// Every form of `owner`, newest first
    pub async fn list_forms(&self, owner: &str) -> Result<Vec<FormDocument>, FormError> {
        let owner = owner.to_string();
        let mut forms = self
            .forms
            .list(&move |form: &FormDocument| form.owner_id == owner)
            .await?;
        forms.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(forms)
    }

    /// Apply a partial update
    pub async fn update_form(
        &self,
        owner: &str,
        form_id: &str,
        update: FormUpdate,
    ) -> Result<FormDocument, FormError> {
        let mut form = self.get_form(owner, form_id).await?;

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(FormError::EmptyName);
            }
            form.name = name.to_string();
        }
        if let Some(fields) = update.fields {
            check_fields(&fields)?;
            form.flow.fields = fields;
        }
        if let Some(customization) = update.customization {
            form.flow.customization = customization;
        }
        if let Some(status) = update.status {
            if status == FormStatus::Published && form.flow.fields.is_empty() {
                return Err(FormError::EmptyForm(form.id));
            }
            form.status = status;
        }

        self.save(form).await
    }

    /// Delete a form and every response to it
    pub async fn delete_form(&self, owner: &str, form_id: &str) -> Result<(), FormError> {
        self.get_form(owner, form_id).await?;

        let target = form_id.to_string();
        let responses = self
            .responses
            .list(&move |r: &FormResponse| r.form_id == target)
            .await?;
        for response in &responses {
            self.responses.delete(&response.id).await?;
        }
        self.forms.delete(form_id).await?;

        tracing::info!(form_id, responses = responses.len(), "Form deleted");
        Ok(())
    }

    /// Append a field with editor defaults
    pub async fn add_field(
        &self,
        owner: &str,
        form_id: &str,
        field_type: FieldType,
    ) -> Result<Field, FormError> {
        let mut form = self.get_form(owner, form_id).await?;
        let field = Field::with_defaults(self.ids.next_id(), field_type);
        form.flow.fields.push(field.clone());
        self.save(form).await?;
        Ok(field)
    }

    /// Replace the field with the same id
    pub async fn update_field(
        &self,
        owner: &str,
        form_id: &str,
        field: Field,
    ) -> Result<FormDocument, FormError> {
        field.check()?;
        let mut form = self.get_form(owner, form_id).await?;
        let slot = form
            .flow
            .fields
            .iter_mut()
            .find(|f| f.id == field.id)
            .ok_or_else(|| FormError::FieldNotFound {
                form_id: form_id.to_string(),
                field_id: field.id.clone(),
            })?;
        *slot = field;
        self.save(form).await
    }

    /// Remove a field
    pub async fn remove_field(
        &self,
        owner: &str,
        form_id: &str,
        field_id: &str,
    ) -> Result<FormDocument, FormError> {
        let mut form = self.get_form(owner, form_id).await?;
        let before = form.flow.fields.len();
        form.flow.fields.retain(|f| f.id != field_id);
        if form.flow.fields.len() == before {
            return Err(FormError::FieldNotFound {
                form_id: form_id.to_string(),
                field_id: field_id.to_string(),
            });
        }
        self.save(form).await
    }

    /// Open a form for responses
    ///
    /// A form needs at least one valid field to be published.
    pub async fn publish(&self, owner: &str, form_id: &str) -> Result<FormDocument, FormError> {
        let form = self.get_form(owner, form_id).await?;
        check_fields(&form.flow.fields)?;
        let form = self
            .update_form(
                owner,
                form_id,
                FormUpdate {
                    status: Some(FormStatus::Published),
                    ..FormUpdate::default()
                },
            )
            .await?;
        tracing::info!(form_id, fields = form.flow.fields.len(), "Form published");
        Ok(form)
    }

    /// Snapshot of a published form for respondents
    pub async fn public_form(&self, form_id: &str) -> Result<FormSource, FormError> {
        Ok(self.published(form_id).await?.source())
    }

    /// Store a completed response to a published form
    pub async fn record_response(
        &self,
        form_id: &str,
        answers: Answers,
    ) -> Result<FormResponse, FormError> {
        self.published(form_id).await?;

        let response = FormResponse {
            id: self.ids.next_id(),
            form_id: form_id.to_string(),
            data: answers,
            submitted_at: Utc::now(),
        };
        let response = self.responses.create(response).await?;
        tracing::info!(form_id, response_id = %response.id, "Response recorded");
        Ok(response)
    }

    /// Responses to one of the owner's forms, newest first
    pub async fn list_responses(
        &self,
        owner: &str,
        form_id: &str,
    ) -> Result<Vec<FormResponse>, FormError> {
        self.get_form(owner, form_id).await?;

        let target = form_id.to_string();
        let mut responses = self
            .responses
            .list(&move |r: &FormResponse| r.form_id == target)
            .await?;
        responses.sort_by(|a, b| {
            b.submitted_at
                .cmp(&a.submitted_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(responses)
    }

    async fn published(&self, form_id: &str) -> Result<FormDocument, FormError> {
        let form = self
            .forms
            .get(form_id)
            .await?
            .ok_or_else(|| FormError::NotFound(form_id.to_string()))?;
        if !form.is_published() {
            return Err(FormError::NotPublished(form_id.to_string()));
        }
        Ok(form)
    }

    async fn save(&self, mut form: FormDocument) -> Result<FormDocument, FormError> {
        form.updated_at = Utc::now();
        tracing::debug!(form_id = %form.id, "Form saved");
        Ok(self.forms.update(form).await?)
    }
}

/// Response sink that records straight into a [`FormService`]
pub struct RepositoryResponseSink {
    service: Arc<FormService>,
}

impl RepositoryResponseSink {
    /// Record through `service`
    pub fn new(service: Arc<FormService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ResponseSink for RepositoryResponseSink {
    fn name(&self) -> &str {
        "repository"
    }

    async fn submit_response(
        &self,
        form_id: &str,
        answers: &Answers,
    ) -> Result<Ack, SubmissionError> {
        let response = self
            .service
            .record_response(form_id, answers.clone())
            .await?;
        Ok(Ack {
            response_id: response.id,
            submitted_at: response.submitted_at,
        })
    }
}
