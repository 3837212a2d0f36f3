//! Traversal State Machine
//!
//! Walks a respondent through the effective field list one field at a time.
//!
//! # States
//!
//! ```text
//!  NotStarted ──start──▶ Active(0) ──submit──▶ Active(1) ─ ... ─▶ AllAnswered ──complete──▶ Submitted
//!                           ▲                      │
//!                           └──────retreat─────────┘   (wizard mode only)
//! ```
//!
//! The machine is mutated only through [`TraversalState::start`],
//! [`TraversalState::record_draft`], [`TraversalState::submit_current`] and
//! [`TraversalState::retreat`]. The final step to `Submitted` belongs to the
//! submission coordinator, which calls [`TraversalState::mark_submitted`]
//! once the response sink has acknowledged the answers.
//!
//! # Invalid Calls
//!
//! Calling an operation from a state that does not allow it never panics and
//! never changes anything: the call returns [`Transition::Ignored`] carrying
//! the [`SessionError`] that explains why.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::augment::{augment, EffectiveFieldList};
use crate::field::Field;
use crate::validation::{validate, ValidationError};

/// Committed answers keyed by field id
pub type Answers = BTreeMap<String, String>;

/// Where a session is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "index", rename_all = "snake_case")]
pub enum Phase {
    /// Welcome phase, nothing asked yet
    NotStarted,
    /// Asking the field at this index
    Active(usize),
    /// Every field answered, waiting for submission
    AllAnswered,
    /// Answers accepted by the response sink
    Submitted,
}

impl Phase {
    /// Index into the effective field list, `-1` before start
    ///
    /// `AllAnswered` and `Submitted` both map to `total`.
    #[must_use]
    pub fn position(&self, total: usize) -> isize {
        let clamp = |n: usize| isize::try_from(n).unwrap_or(isize::MAX);
        match self {
            Self::NotStarted => -1,
            Self::Active(index) => clamp(*index),
            Self::AllAnswered | Self::Submitted => clamp(total),
        }
    }

    /// Whether no further transition is possible
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Active(index) => write!(f, "active at field {index}"),
            Self::AllAnswered => write!(f, "all answered"),
            Self::Submitted => write!(f, "submitted"),
        }
    }
}

/// How the form is presented to the respondent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Conversational transcript, one question per bot message
    #[default]
    Chat,
    /// One field per page with back navigation
    Wizard,
    /// Every field on one page
    SinglePage,
}

impl FillMode {
    /// Whether drafts are cut at `maxLength` instead of failing validation
    #[must_use]
    pub fn caps_input(&self) -> bool {
        matches!(self, Self::Wizard | Self::SinglePage)
    }

    /// Whether [`TraversalState::retreat`] is available
    #[must_use]
    pub fn allows_retreat(&self) -> bool {
        matches!(self, Self::Wizard)
    }

    /// Config/CLI name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Wizard => "wizard",
            Self::SinglePage => "single",
        }
    }
}

impl fmt::Display for FillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillMode {
    type Err = UnknownFillMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "wizard" | "steps" => Ok(Self::Wizard),
            "single" | "single_page" | "page" => Ok(Self::SinglePage),
            other => Err(UnknownFillMode(other.to_string())),
        }
    }
}

/// Unrecognized fill mode name
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown fill mode '{0}' (expected chat, wizard or single)")]
pub struct UnknownFillMode(pub String);

/// An operation called from a state that does not allow it
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Operation not valid in the current phase
    #[error("{operation} is not allowed while {phase}")]
    InvalidPhase {
        /// Name of the rejected operation
        operation: &'static str,
        /// Phase at the time of the call
        phase: Phase,
    },

    /// Retreat requested outside wizard mode
    #[error("retreat is only available in wizard mode, not {0}")]
    RetreatUnsupported(FillMode),

    /// Retreat requested on the first field
    #[error("already at the first field")]
    AtFirstField,
}

/// What an operation did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Session left the welcome phase
    Started {
        /// Phase entered (`AllAnswered` when there are no fields)
        phase: Phase,
    },
    /// Draft replaced, error cleared
    DraftRecorded,
    /// Answer accepted and committed
    Advanced {
        /// Field that was answered
        field_id: String,
        /// Committed value
        value: String,
        /// Phase entered
        next: Phase,
    },
    /// Answer failed validation; nothing moved
    Rejected {
        /// Field that was answered
        field_id: String,
        /// Why it failed
        error: ValidationError,
    },
    /// Moved back one field
    Retreated {
        /// Index now active
        to: usize,
    },
    /// Answers delivered; session closed
    Submitted,
    /// Call was not valid in the current state and changed nothing
    Ignored(SessionError),
}

impl Transition {
    /// Whether the call was a no-op
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }
}

/// State of one respondent filling one form
#[derive(Clone, Debug)]
pub struct TraversalState {
    fields: EffectiveFieldList,
    mode: FillMode,
    phase: Phase,
    answers: Answers,
    draft: String,
    current_error: Option<ValidationError>,
}

impl TraversalState {
    /// Create a session over the author's fields
    ///
    /// Augmentation happens here, once; later edits to the form do not
    /// reach this session.
    #[must_use]
    pub fn new(author_fields: &[Field], mode: FillMode) -> Self {
        Self::from_effective(augment(author_fields), mode)
    }

    /// Create a session over an already augmented list
    #[must_use]
    pub fn from_effective(fields: EffectiveFieldList, mode: FillMode) -> Self {
        Self {
            fields,
            mode,
            phase: Phase::NotStarted,
            answers: Answers::new(),
            draft: String::new(),
            current_error: None,
        }
    }

    /// Leave the welcome phase
    pub fn start(&mut self) -> Transition {
        if self.phase != Phase::NotStarted {
            return self.ignore("start");
        }

        self.phase = if self.fields.is_empty() {
            Phase::AllAnswered
        } else {
            Phase::Active(0)
        };
        tracing::debug!(phase = %self.phase, fields = self.fields.len(), "Traversal started");
        Transition::Started { phase: self.phase }
    }

    /// Replace the in-progress value of the active field
    ///
    /// In wizard and single-page modes the draft of a text field is cut at
    /// the field's `maxLength`, like a capped input box.
    pub fn record_draft(&mut self, value: impl Into<String>) -> Transition {
        let Phase::Active(index) = self.phase else {
            return self.ignore("record_draft");
        };

        let mut value = value.into();
        if self.mode.caps_input() {
            let limit = self
                .fields
                .get(index)
                .filter(|f| f.field_type.supports_max_length())
                .and_then(|f| f.max_length);
            if let Some(limit) = limit {
                truncate_chars(&mut value, limit);
            }
        }

        self.draft = value;
        self.current_error = None;
        Transition::DraftRecorded
    }

    /// Validate and commit an answer for the active field
    ///
    /// `value` is used when given (a choice click commits immediately);
    /// otherwise the current draft is submitted.
    pub fn submit_current(&mut self, value: Option<&str>) -> Transition {
        let Phase::Active(index) = self.phase else {
            return self.ignore("submit_current");
        };
        let Some(field) = self.fields.get(index) else {
            return self.ignore("submit_current");
        };

        let value = value.map_or_else(|| self.draft.clone(), str::to_string);
        let field_id = field.id.clone();

        if let Some(error) = validate(field, &value) {
            tracing::debug!(field = %field_id, error = error.code(), "Answer rejected");
            self.current_error = Some(error);
            return Transition::Rejected { field_id, error };
        }

        self.answers.insert(field_id.clone(), value.clone());
        self.draft.clear();
        self.current_error = None;
        self.phase = if index + 1 < self.fields.len() {
            Phase::Active(index + 1)
        } else {
            Phase::AllAnswered
        };

        tracing::debug!(field = %field_id, next = %self.phase, "Answer accepted");
        Transition::Advanced {
            field_id,
            value,
            next: self.phase,
        }
    }

    /// Step back to the previous field (wizard mode)
    ///
    /// The answer of the field being left is kept. The previous field's
    /// committed answer becomes the draft so it can be edited. From
    /// `AllAnswered` this returns to the last field.
    pub fn retreat(&mut self) -> Transition {
        if !self.mode.allows_retreat() {
            return self.ignore_with(SessionError::RetreatUnsupported(self.mode));
        }

        let target = match self.phase {
            Phase::Active(0) => return self.ignore_with(SessionError::AtFirstField),
            Phase::Active(index) => index - 1,
            Phase::AllAnswered if !self.fields.is_empty() => self.fields.len() - 1,
            _ => return self.ignore("retreat"),
        };

        self.draft = self
            .fields
            .get(target)
            .and_then(|f| self.answers.get(&f.id))
            .cloned()
            .unwrap_or_default();
        self.current_error = None;
        self.phase = Phase::Active(target);

        tracing::debug!(to = target, "Retreated");
        Transition::Retreated { to: target }
    }

    /// Answers ready for submission, if every field has been answered
    #[must_use]
    pub fn pending_answers(&self) -> Option<&Answers> {
        (self.phase == Phase::AllAnswered).then_some(&self.answers)
    }

    /// Close the session after the sink acknowledged the answers
    pub fn mark_submitted(&mut self) -> Transition {
        if self.phase != Phase::AllAnswered {
            return self.ignore("mark_submitted");
        }
        self.phase = Phase::Submitted;
        tracing::debug!(answers = self.answers.len(), "Traversal submitted");
        Transition::Submitted
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Position in `[-1, N]`
    #[must_use]
    pub fn position(&self) -> isize {
        self.phase.position(self.fields.len())
    }

    /// Presentation mode
    #[must_use]
    pub fn mode(&self) -> FillMode {
        self.mode
    }

    /// The effective field list
    #[must_use]
    pub fn fields(&self) -> &EffectiveFieldList {
        &self.fields
    }

    /// Field being asked, if any
    #[must_use]
    pub fn current_field(&self) -> Option<&Field> {
        match self.phase {
            Phase::Active(index) => self.fields.get(index),
            _ => None,
        }
    }

    /// Committed answers
    #[must_use]
    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    /// In-progress value of the active field
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Validation error of the active field
    #[must_use]
    pub fn current_error(&self) -> Option<ValidationError> {
        self.current_error
    }

    /// Fraction of fields reached, `(position + 1) / N` clamped to `[0, 1]`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        let total = self.fields.len();
        match self.phase {
            _ if total == 0 => 1.0,
            Phase::NotStarted => 0.0,
            Phase::Active(index) => ((index + 1) as f64 / total as f64).min(1.0),
            Phase::AllAnswered | Phase::Submitted => 1.0,
        }
    }

    /// Fields before the active one paired with their committed answers
    ///
    /// This is the question/answer history a chat transcript shows.
    #[must_use]
    pub fn answered_pairs(&self) -> Vec<(&Field, &str)> {
        let reached = match self.phase {
            Phase::NotStarted => 0,
            Phase::Active(index) => index,
            Phase::AllAnswered | Phase::Submitted => self.fields.len(),
        };
        self.fields
            .iter()
            .take(reached)
            .filter_map(|f| self.answers.get(&f.id).map(|a| (f, a.as_str())))
            .collect()
    }

    fn ignore(&self, operation: &'static str) -> Transition {
        self.ignore_with(SessionError::InvalidPhase {
            operation,
            phase: self.phase,
        })
    }

    fn ignore_with(&self, error: SessionError) -> Transition {
        tracing::debug!(phase = %self.phase, error = %error, "Ignored traversal operation");
        Transition::Ignored(error)
    }
}

/// Cut `value` to at most `limit` characters
pub(crate) fn truncate_chars(value: &mut String, limit: usize) {
    if let Some((byte_index, _)) = value.char_indices().nth(limit) {
        value.truncate(byte_index);
    }
}
