//! Cancellation and deadlines for index operations
//!
//! A `Context` is cheap to clone; all clones share the same cancel flag, so a
//! caller can hand one clone to a worker thread and cancel it from another.

use crate::error::IndexError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Deadline plus cancel flag honored by every database call
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    canceled: Arc<AtomicBool>,
}

impl Context {
    /// A context that never expires unless canceled explicitly
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            canceled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel this context and every clone of it
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// True once the context is canceled or past its deadline
    pub fn is_done(&self) -> bool {
        self.is_canceled() || self.is_expired()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The error describing why this context is done, if it is
    pub fn err(&self, op: &'static str) -> Option<IndexError> {
        if self.is_canceled() {
            Some(IndexError::Canceled { op })
        } else if self.is_expired() {
            Some(IndexError::QueryTimeout { op })
        } else {
            None
        }
    }

    /// Fail fast before starting (or continuing) work on a done context
    pub fn check(&self, op: &'static str) -> Result<(), IndexError> {
        match self.err(op) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
