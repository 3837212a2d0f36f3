//! Response Sinks
//!
//! Where completed answers go. A filling session hands its answers to a
//! [`ResponseSink`] exactly once, after the respondent reaches the end of the
//! field list.
//!
//! # Available Sinks
//!
//! - **HTTP**: `POST /api/forms/{id}/responses` on a ChatFlow server
//! - **FormService**: in-process, straight into the response repository
//!   (see [`crate::forms`])
//!
//! # Usage
//!
//! ```ignore
//! use chatflow_core::sink::{HttpResponseSink, ResponseSink};
//!
//! let sink = HttpResponseSink::new("http://localhost:5000")?;
//! let ack = sink.submit_response("42", &answers).await?;
//! ```

mod http;
mod traits;

pub use http::HttpResponseSink;
pub use traits::{Ack, ResponseSink, SubmissionError};
