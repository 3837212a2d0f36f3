//! ChatFlow Core - Conversational Form Filling
//!
//! This crate holds the logic behind ChatFlow forms: field definitions,
//! answer validation, the state machine that walks a respondent through a
//! form one question at a time, and delivery of the finished answers. It
//! has no UI; the `chatflow` CLI and any web surface drive it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Surfaces                                 │
//! │   ┌──────────┐   ┌──────────┐   ┌──────────────────────────┐     │
//! │   │   Chat   │   │  Wizard  │   │       Single page        │     │
//! │   └────┬─────┘   └────┬─────┘   └────────────┬─────────────┘     │
//! │        └──────────────┴──────────────────────┘                   │
//! │                       │  StepView / ChatTranscript               │
//! └───────────────────────┼──────────────────────────────────────────┘
//!                         │
//! ┌───────────────────────┼──────────────────────────────────────────┐
//! │                  CHATFLOW CORE                                   │
//! │  ┌────────────────────┴───────────────────────────────────────┐  │
//! │  │                    FillSession                             │  │
//! │  │  ┌──────────┐  ┌────────────┐  ┌───────────┐  ┌──────────┐ │  │
//! │  │  │ augment  │─▶│ Traversal  │─▶│ validate  │  │ Response │ │  │
//! │  │  │ (contact)│  │   State    │  │           │  │   Sink   │ │  │
//! │  │  └──────────┘  └────────────┘  └───────────┘  └────┬─────┘ │  │
//! │  └────────────────────────────────────────────────────┼───────┘  │
//! │                                      ┌────────────────┴───────┐  │
//! │                                      │ HTTP  │  FormService   │  │
//! │                                      └────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Field`]: One question of a form
//! - [`TraversalState`]: The per-respondent state machine
//! - [`FillSession`]: Traversal plus exactly-once delivery
//! - [`ResponseSink`]: Where finished answers go
//! - [`FormService`]: Authoring, publishing and response storage
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatflow_core::{FillMode, FillSession, FormService, RepositoryResponseSink};
//!
//! let service = Arc::new(FormService::in_memory());
//! let source = service.public_form(&form_id).await?;
//! let sink = Arc::new(RepositoryResponseSink::new(service.clone()));
//!
//! let mut session = FillSession::new(form_id, &source, FillMode::Chat, sink);
//! session.start();
//! session.submit_current(Some("(11) 91234-5678"));
//! // ...
//! session.complete().await?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod augment;
pub mod config;
pub mod field;
pub mod forms;
pub mod ids;
pub mod presentation;
pub mod repository;
pub mod session;
pub mod sink;
pub mod traversal;
pub mod validation;

// Re-export commonly used types
pub use augment::{augment, EffectiveFieldList};
pub use config::{
    default_config_path, load_config, load_config_from_path, ChatflowConfig, ConfigError,
    ConfigOverrides, ConfigSource,
};
pub use field::{
    check_fields, Field, FieldDefinitionError, FieldType, FlowDocument, FormCustomization,
    FormSource, FormStatus, REQUIRED_EMAIL_ID, REQUIRED_PHONE_ID,
};
pub use forms::{FormDocument, FormError, FormResponse, FormService, FormUpdate, RepositoryResponseSink};
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use presentation::{
    ChatMessage, ChatTranscript, HelpChat, InputKind, Sender, SinglePageForm, StepView,
};
pub use repository::{Entity, InMemoryRepository, Repository, RepositoryError};
pub use session::{Completion, FillSession, SessionId};
pub use sink::{Ack, HttpResponseSink, ResponseSink, SubmissionError};
pub use traversal::{
    Answers, FillMode, Phase, SessionError, Transition, TraversalState, UnknownFillMode,
};
pub use validation::{validate, validate_all, ValidationError};
