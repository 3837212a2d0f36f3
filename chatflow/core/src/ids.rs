//! Identifier Generation
//!
//! Fields, transcript messages, forms and responses all need fresh ids.
//! Components take an [`IdGenerator`] so tests can swap the random
//! generator for a predictable one.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of fresh identifiers
pub trait IdGenerator: Send + Sync {
    /// Produce an id not returned before by this generator
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `prefix_N` ids counting up from 1
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    /// Create a generator producing `prefix_1`, `prefix_2`, ...
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}_{n}", self.prefix)
    }
}
