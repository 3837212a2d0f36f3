//! HTTP Response Sink
//!
//! Posts answers to a ChatFlow server.
//!
//! # Server API
//!
//! - `POST /api/forms/{id}/responses` with body `{"data": {fieldId: value}}`
//! - `201`/`200` with the stored response `{"id": .., "submittedAt": ..}`
//! - `404` when the form does not exist, `403` when it is not published
//!
//! The server's id may be a number or a string. A reply without an id or
//! timestamp is still an acknowledgement; the missing parts are filled in
//! locally.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;

use super::traits::{Ack, ResponseSink, SubmissionError};
use crate::ids::{IdGenerator, UuidIds};
use crate::traversal::Answers;

/// Default per-request timeout
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response sink backed by a ChatFlow HTTP server
#[derive(Clone)]
pub struct HttpResponseSink {
    /// Server base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
    /// Per-request timeout
    request_timeout: Duration,
    /// Fallback ids for replies that carry none
    ids: Arc<dyn IdGenerator>,
}

impl HttpResponseSink {
    /// Create a sink for the server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, SubmissionError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            ids: Arc::new(UuidIds),
        })
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the generator used when the server omits a response id
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Server base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Responses endpoint for a form
    fn responses_url(&self, form_id: &str) -> String {
        format!("{}/api/forms/{}/responses", self.base_url, form_id)
    }

    /// Turn a success body into an [`Ack`]
    fn parse_ack(&self, body: &serde_json::Value) -> Ack {
        let response_id = match body.get("id") {
            Some(serde_json::Value::String(id)) => id.clone(),
            Some(serde_json::Value::Number(id)) => id.to_string(),
            _ => self.ids.next_id(),
        };
        let submitted_at = body
            .get("submittedAt")
            .and_then(serde_json::Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map_or_else(Utc::now, |t| t.with_timezone(&Utc));

        Ack {
            response_id,
            submitted_at,
        }
    }
}

/// Pull a human-readable message out of an error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl ResponseSink for HttpResponseSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit_response(
        &self,
        form_id: &str,
        answers: &Answers,
    ) -> Result<Ack, SubmissionError> {
        let url = self.responses_url(form_id);
        tracing::debug!(url = %url, answers = answers.len(), "Posting response");

        let response = self
            .http_client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&serde_json::json!({ "data": answers }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmissionError::TimedOut(self.request_timeout)
                } else {
                    SubmissionError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            // An unparseable body is still an acknowledgement
            let body = response
                .json::<serde_json::Value>()
                .await
                .unwrap_or(serde_json::Value::Null);
            let ack = self.parse_ack(&body);
            tracing::info!(form_id, response_id = %ack.response_id, "Response recorded");
            return Ok(ack);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(form_id, status = status.as_u16(), "Response rejected");

        Err(match status {
            StatusCode::NOT_FOUND => SubmissionError::FormNotFound {
                form_id: form_id.to_string(),
            },
            StatusCode::FORBIDDEN => SubmissionError::NotPublished {
                form_id: form_id.to_string(),
            },
            _ => SubmissionError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            },
        })
    }
}
