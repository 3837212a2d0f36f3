//! Filling Sessions
//!
//! A [`FillSession`] is one respondent filling one form. It owns the
//! traversal state machine and the response sink, and it is the only place
//! that moves a session from `AllAnswered` to `Submitted`.
//!
//! # Design Philosophy
//!
//! The traversal machine is synchronous and knows nothing about delivery.
//! Delivery is async, may fail, and may be slow. Keeping the two apart means
//! a failed submission leaves the machine exactly where it was: answers
//! intact, still `AllAnswered`, ready for another `complete()`.
//!
//! # Exactly Once
//!
//! `complete()` takes `&mut self`, so two deliveries of the same session can
//! never be in flight at once. After one succeeds the session is
//! `Submitted` and further calls return the stored acknowledgement without
//! touching the sink.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::field::FormSource;
use crate::ids::{IdGenerator, UuidIds};
use crate::sink::{Ack, ResponseSink, SubmissionError};
use crate::traversal::{FillMode, Phase, SessionError, Transition, TraversalState};

/// Unique identifier for a filling session
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Take the next id from `ids`
    pub fn generate(ids: &dyn IdGenerator) -> Self {
        Self(ids.next_id())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of [`FillSession::complete`] when nothing went wrong
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The sink recorded the answers just now
    Submitted(Ack),
    /// An earlier call already delivered them; the sink was not called
    AlreadySubmitted(Ack),
    /// The session has not reached `AllAnswered`
    NotReady(SessionError),
}

/// One respondent filling one form
pub struct FillSession<S: ResponseSink + ?Sized> {
    id: SessionId,
    form_id: String,
    title: String,
    state: TraversalState,
    sink: Arc<S>,
    submit_timeout: Option<Duration>,
    ack: Option<Ack>,
    attempts: u32,
}

impl<S: ResponseSink + ?Sized> FillSession<S> {
    /// Create a session over a form snapshot
    pub fn new(form_id: impl Into<String>, source: &FormSource, mode: FillMode, sink: Arc<S>) -> Self {
        Self::from_state(
            form_id,
            source.title.clone(),
            TraversalState::new(&source.fields, mode),
            sink,
        )
    }

    /// Wrap an existing traversal state
    ///
    /// Used by surfaces that drive the state machine themselves (the
    /// single-page form) and only need delivery.
    pub fn from_state(
        form_id: impl Into<String>,
        title: impl Into<String>,
        state: TraversalState,
        sink: Arc<S>,
    ) -> Self {
        let session = Self {
            id: SessionId::generate(&UuidIds),
            form_id: form_id.into(),
            title: title.into(),
            state,
            sink,
            submit_timeout: None,
            ack: None,
            attempts: 0,
        };
        tracing::debug!(
            session_id = %session.id,
            form_id = %session.form_id,
            mode = %session.state.mode(),
            fields = session.state.fields().len(),
            "Fill session created"
        );
        session
    }

    /// Draw the session id from `ids` instead of random UUIDs
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.id = SessionId::generate(ids.as_ref());
        self
    }

    /// Bound how long one delivery attempt may take
    #[must_use]
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = Some(timeout);
        self
    }

    /// Leave the welcome phase
    pub fn start(&mut self) -> Transition {
        self.state.start()
    }

    /// Replace the draft of the active field
    pub fn record_draft(&mut self, value: impl Into<String>) -> Transition {
        self.state.record_draft(value)
    }

    /// Validate and commit the active field
    pub fn submit_current(&mut self, value: Option<&str>) -> Transition {
        self.state.submit_current(value)
    }

    /// Step back one field (wizard mode)
    pub fn retreat(&mut self) -> Transition {
        self.state.retreat()
    }

    /// Deliver the answers to the sink
    ///
    /// On failure the session stays `AllAnswered` with its answers intact
    /// and the error is returned; calling again retries.
    pub async fn complete(&mut self) -> Result<Completion, SubmissionError> {
        if let Some(ack) = &self.ack {
            tracing::debug!(session_id = %self.id, "Already submitted, sink not called");
            return Ok(Completion::AlreadySubmitted(ack.clone()));
        }

        let Some(answers) = self.state.pending_answers() else {
            return Ok(Completion::NotReady(SessionError::InvalidPhase {
                operation: "complete",
                phase: self.state.phase(),
            }));
        };

        self.attempts += 1;
        tracing::debug!(
            session_id = %self.id,
            sink = self.sink.name(),
            attempt = self.attempts,
            "Delivering answers"
        );

        let delivery = self.sink.submit_response(&self.form_id, answers);
        let result = match self.submit_timeout {
            Some(limit) => tokio::time::timeout(limit, delivery)
                .await
                .unwrap_or(Err(SubmissionError::TimedOut(limit))),
            None => delivery.await,
        };

        match result {
            Ok(ack) => {
                self.state.mark_submitted();
                self.ack = Some(ack.clone());
                tracing::info!(
                    session_id = %self.id,
                    response_id = %ack.response_id,
                    "Answers delivered"
                );
                Ok(Completion::Submitted(ack))
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.id,
                    attempt = self.attempts,
                    error = %e,
                    "Delivery failed, answers kept"
                );
                Err(e)
            }
        }
    }

    /// Session identifier
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Target form
    #[must_use]
    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    /// Form title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Underlying state machine
    #[must_use]
    pub fn state(&self) -> &TraversalState {
        &self.state
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Acknowledgement of the successful delivery, if any
    #[must_use]
    pub fn ack(&self) -> Option<&Ack> {
        self.ack.as_ref()
    }

    /// Number of delivery attempts made
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
