// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Error types
//!
//! Every fallible operation in the crate reports an [`EntijError`]. The
//! variants follow the failure categories the model distinguishes: invalid
//! arguments, state violations, concurrent modification of a listener chain,
//! failed lookups and casts, and asynchronous task outcomes.

use crate::value::ValueKind;
use std::io;
use thiserror::Error;

/// Errors raised by entities, containers and the async pool
#[derive(Debug, Error)]
pub enum EntijError {
    /// An argument was rejected before any state was touched
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A mutator was called on a read-only entity set
    #[error("this set is read only")]
    ReadOnly,

    /// The pool has begun shutting down and refuses new submissions
    #[error("async entry pool has been shut down and cannot accept new submissions")]
    PoolShutdown,

    /// The worker behind an async entry has already been stopped
    #[error("async entry worker has been shut down")]
    EntryShutdown,

    /// A mutator was called on an object that does not support it
    #[error("{0} is unmodifiable")]
    Unmodifiable(&'static str),

    /// A cursor operation was called in the wrong state
    #[error("illegal cursor state: {0}")]
    IllegalCursorState(&'static str),

    /// A traversal reached a node that was removed underneath it
    #[error("listener chain was modified during traversal")]
    ConcurrentModification,

    /// No function with the given name exists in the record chain
    #[error("no function named `{0}` in the function record chain")]
    FunctionNotFound(String),

    /// A dynamic value did not have the requested shape
    #[error("cannot cast {found:?} value to {expected}")]
    Cast {
        /// Name of the requested type
        expected: &'static str,
        /// Kind of the stored value
        found: ValueKind,
    },

    /// The task was cancelled before it started
    #[error("task was cancelled before it started")]
    TaskCancelled,

    /// The task panicked while running on its worker
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// The worker thread for an async entry could not be started
    #[error("failed to spawn async worker: {0}")]
    WorkerSpawn(#[from] io::Error),
}

impl EntijError {
    /// Convenience constructor for [`EntijError::InvalidArgument`]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        EntijError::InvalidArgument(message.into())
    }

    /// True for the state-violation family of errors
    pub fn is_state_violation(&self) -> bool {
        matches!(
            self,
            EntijError::ReadOnly
                | EntijError::PoolShutdown
                | EntijError::EntryShutdown
                | EntijError::Unmodifiable(_)
                | EntijError::IllegalCursorState(_)
        )
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, EntijError>;

/// Extracts a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_violation_family() {
        assert!(EntijError::ReadOnly.is_state_violation());
        assert!(EntijError::PoolShutdown.is_state_violation());
        assert!(EntijError::IllegalCursorState("remove already called").is_state_violation());
        assert!(!EntijError::ConcurrentModification.is_state_violation());
        assert!(!EntijError::invalid_argument("x").is_state_violation());
    }

    #[test]
    fn test_display_messages() {
        let err = EntijError::FunctionNotFound("jump".to_string());
        assert_eq!(err.to_string(), "no function named `jump` in the function record chain");

        let err = EntijError::Cast { expected: "i64", found: ValueKind::Text };
        assert!(err.to_string().contains("i64"));
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
