//! JSON-lines response sink
//!
//! Used when no ChatFlow server is configured. Each response is appended as
//! one line `{"id", "formId", "data", "submittedAt"}`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use chatflow_core::{Ack, Answers, IdGenerator, ResponseSink, SubmissionError, UuidIds};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponseLine<'a> {
    id: &'a str,
    form_id: &'a str,
    data: &'a Answers,
    submitted_at: chrono::DateTime<chrono::Utc>,
}

/// Appends responses to a local file
pub struct JsonLinesSink {
    path: PathBuf,
    ids: UuidIds,
}

impl JsonLinesSink {
    /// Append to `path`, creating it on first use
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ids: UuidIds,
        }
    }

    /// Target file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResponseSink for JsonLinesSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn submit_response(
        &self,
        form_id: &str,
        answers: &Answers,
    ) -> Result<Ack, SubmissionError> {
        let ack = Ack::now(self.ids.next_id());
        let line = ResponseLine {
            id: &ack.response_id,
            form_id,
            data: answers,
            submitted_at: ack.submitted_at,
        };
        let mut encoded =
            serde_json::to_string(&line).map_err(|e| SubmissionError::Storage(e.to_string()))?;
        encoded.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| SubmissionError::Storage(format!("{}: {e}", self.path.display())))?;
        file.write_all(encoded.as_bytes())
            .await
            .map_err(|e| SubmissionError::Storage(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| SubmissionError::Storage(e.to_string()))?;

        tracing::info!(path = %self.path.display(), response_id = %ack.response_id, "Response appended");
        Ok(ack)
    }
}
