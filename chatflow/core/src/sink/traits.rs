//! Response Sink Traits
//!
//! The contract between the submission coordinator and whatever durably
//! records a completed response. Implementations handle transport details
//! (HTTP, in-process storage, files) and map their failures onto
//! [`SubmissionError`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traversal::Answers;

/// Receipt for a recorded response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    /// Id the sink assigned to the response
    pub response_id: String,
    /// When the sink recorded it
    pub submitted_at: DateTime<Utc>,
}

impl Ack {
    /// Receipt stamped with the current time
    pub fn now(response_id: impl Into<String>) -> Self {
        Self {
            response_id: response_id.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// Why a response could not be recorded
///
/// Every variant is recoverable from the session's point of view: the
/// answers stay pending and `complete()` may be called again.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The form exists but is not accepting responses
    #[error("form {form_id} is not published")]
    NotPublished {
        /// Target form
        form_id: String,
    },

    /// The form does not exist
    #[error("form {form_id} not found")]
    FormNotFound {
        /// Target form
        form_id: String,
    },

    /// The sink answered with an error status
    #[error("response rejected with status {status}: {message}")]
    Rejected {
        /// HTTP-style status code
        status: u16,
        /// Server-provided explanation
        message: String,
    },

    /// The sink could not be reached
    #[error("transport error: {0}")]
    Transport(String),

    /// The caller's deadline passed before the sink answered
    #[error("submission timed out after {0:?}")]
    TimedOut(Duration),

    /// Storage behind the sink failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl SubmissionError {
    /// Whether retrying the same submission may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotPublished { .. } | Self::FormNotFound { .. } => false,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::Transport(_) | Self::TimedOut(_) | Self::Storage(_) => true,
        }
    }
}

/// Destination for completed responses
///
/// Implement this trait to record responses somewhere new.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    /// Sink name for logs (e.g., "http", "memory")
    fn name(&self) -> &str;

    /// Record `answers` as one response to `form_id`
    async fn submit_response(
        &self,
        form_id: &str,
        answers: &Answers,
    ) -> Result<Ack, SubmissionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SubmissionError::Transport("reset".into()).is_retryable());
        assert!(SubmissionError::TimedOut(Duration::from_secs(1)).is_retryable());
        assert!(SubmissionError::Rejected {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!SubmissionError::Rejected {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!SubmissionError::NotPublished {
            form_id: "1".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_ack_json_shape() {
        let ack = Ack::now("r1");
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["responseId"], "r1");
        assert!(json["submittedAt"].is_string());
    }
}
