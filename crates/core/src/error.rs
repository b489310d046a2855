//! Error types for liveset.

use crate::id::Id;
use std::any::Any;

/// Result type alias for liveset operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for liveset operations.
///
/// Ids are carried in their canonical (encoded) form so errors stay cheap to
/// clone and can be compared in tests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An insert targeted an id that is already present.
    #[error("document already exists: {id}")]
    DuplicateId { id: String },
    /// An update, move or removal targeted an id that is not present.
    #[error("document not found: {id}")]
    NotFound { id: String },
    /// A positional insert or move referenced an anchor that is not present.
    #[error("anchor document not found: {id}")]
    AnchorNotFound { id: String },
    /// The operation is structurally invalid (e.g. moving a document before itself).
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },
    /// The operation is not supported in the current mode.
    #[error("unsupported operation: {message}")]
    Unsupported { message: String },
    /// An encoded identifier could not be parsed.
    #[error("malformed identifier {input:?}: {message}")]
    MalformedId { input: String, message: String },
    /// An encoded identifier carried a `$type` tag this codec does not know.
    #[error("unsupported identifier tag: {tag}")]
    UnsupportedIdTag { tag: String },
    /// The multiplexer has been stopped.
    #[error("multiplexer is stopped")]
    Stopped,
    /// The task queue was destroyed before the task ran.
    #[error("task queue destroyed before the task completed")]
    QueueDestroyed,
    /// A queued task panicked.
    #[error("task {task} panicked: {message}")]
    TaskPanicked { task: String, message: String },
    /// A subscriber supplied an invalid set of callbacks.
    #[error("invalid callbacks: {message}")]
    InvalidCallbacks { message: String },
    /// A subscriber callback failed.
    #[error("callback failed: {message}")]
    Callback { message: String },
    /// A query source failed to produce a result set.
    #[error("query source failed: {message}")]
    Source { message: String },
}

impl Error {
    /// Creates a duplicate id error.
    pub fn duplicate_id(id: &Id) -> Self {
        Error::DuplicateId { id: id.encode() }
    }

    /// Creates a not found error.
    pub fn not_found(id: &Id) -> Self {
        Error::NotFound { id: id.encode() }
    }

    /// Creates an anchor not found error.
    pub fn anchor_not_found(id: &Id) -> Self {
        Error::AnchorNotFound { id: id.encode() }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an unsupported operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::Unsupported {
            message: message.into(),
        }
    }

    /// Creates a malformed id error.
    pub fn malformed_id(input: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MalformedId {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported id tag error.
    pub fn unsupported_id_tag(tag: impl Into<String>) -> Self {
        Error::UnsupportedIdTag { tag: tag.into() }
    }

    /// Creates a task panicked error from a caught panic payload.
    pub fn task_panicked(task: impl Into<String>, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Error::TaskPanicked {
            task: task.into(),
            message,
        }
    }

    /// Creates an invalid callbacks error.
    pub fn invalid_callbacks(message: impl Into<String>) -> Self {
        Error::InvalidCallbacks {
            message: message.into(),
        }
    }

    /// Creates a callback error.
    pub fn callback(message: impl Into<String>) -> Self {
        Error::Callback {
            message: message.into(),
        }
    }

    /// Creates a query source error.
    pub fn source(message: impl Into<String>) -> Self {
        Error::Source {
            message: message.into(),
        }
    }

    /// Returns true if this error reports a broken change-stream invariant.
    ///
    /// Drivers should treat these as bugs in their own reconciliation logic.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Error::DuplicateId { .. }
                | Error::NotFound { .. }
                | Error::AnchorNotFound { .. }
                | Error::InvalidOperation { .. }
        )
    }
}
