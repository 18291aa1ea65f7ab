//! Error types shared by every ledger component.
//!
//! Every business-rule violation is a [`LedgerError`] value returned to the
//! caller. Callers that need to branch on the failure (the HTTP layer, retry
//! loops, tests) use [`LedgerError::kind`] instead of matching on messages.

use crate::types::{EventId, StudentId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable classification of a [`LedgerError`].
///
/// Serialized in `snake_case` (`already_registered`, `store_unavailable`, ...)
/// so clients can match on it without parsing messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing principal or insufficient role
    Unauthorized,
    /// Unknown event, student or college
    NotFound,
    /// Bad capacity, rating, limit or missing required field
    InvalidArgument,
    /// Cancel requested on an event that is already cancelled
    AlreadyCancelled,
    /// The student already holds a registration for the event
    AlreadyRegistered,
    /// Attendance already recorded for the pair
    AlreadyMarked,
    /// Feedback already submitted for the pair
    AlreadySubmitted,
    /// No capacity left on the event
    CapacityExceeded,
    /// The event is cancelled and accepts no new records
    EventCancelled,
    /// Attendance requires a registration under the active policy
    NotRegistered,
    /// Feedback requires attendance under the active policy
    NotAttended,
    /// Transient infrastructure failure, the only retryable kind
    StoreUnavailable,
}

impl ErrorKind {
    /// Wire representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::InvalidArgument => "invalid_argument",
            Self::AlreadyCancelled => "already_cancelled",
            Self::AlreadyRegistered => "already_registered",
            Self::AlreadyMarked => "already_marked",
            Self::AlreadySubmitted => "already_submitted",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::EventCancelled => "event_cancelled",
            Self::NotRegistered => "not_registered",
            Self::NotAttended => "not_attended",
            Self::StoreUnavailable => "store_unavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by ledger operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The principal is missing or lacks the required role.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A referenced entity does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of entity ("event", "student", "college")
        resource: &'static str,
        /// Identifier as supplied by the caller
        id: String,
    },

    /// An argument failed validation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The event was already cancelled.
    #[error("Event {0} is already cancelled")]
    AlreadyCancelled(EventId),

    /// The pair already has a registration.
    #[error("Student {student_id} is already registered for event {event_id}")]
    AlreadyRegistered {
        /// Event
        event_id: EventId,
        /// Student
        student_id: StudentId,
    },

    /// The pair already has an attendance record.
    #[error("Attendance already marked for student {student_id} at event {event_id}")]
    AlreadyMarked {
        /// Event
        event_id: EventId,
        /// Student
        student_id: StudentId,
    },

    /// The pair already submitted feedback.
    #[error("Student {student_id} already submitted feedback for event {event_id}")]
    AlreadySubmitted {
        /// Event
        event_id: EventId,
        /// Student
        student_id: StudentId,
    },

    /// Every seat of the event is taken.
    #[error("Event {event_id} is full ({capacity} registrations)")]
    CapacityExceeded {
        /// Event
        event_id: EventId,
        /// Capacity of the event
        capacity: u32,
    },

    /// The event is cancelled.
    #[error("Event {0} is cancelled")]
    EventCancelled(EventId),

    /// Attendance was attempted without a registration.
    #[error("Student {student_id} is not registered for event {event_id}")]
    NotRegistered {
        /// Event
        event_id: EventId,
        /// Student
        student_id: StudentId,
    },

    /// Feedback was attempted without attendance.
    #[error("Student {student_id} did not attend event {event_id}")]
    NotAttended {
        /// Event
        event_id: EventId,
        /// Student
        student_id: StudentId,
    },

    /// The backing store could not be reached or failed mid-operation.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl LedgerError {
    /// Create an [`LedgerError::Unauthorized`] error.
    #[must_use]
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }

    /// Create a [`LedgerError::NotFound`] error.
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Create a [`LedgerError::InvalidArgument`] error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a [`LedgerError::StoreUnavailable`] error.
    #[must_use]
    pub fn store_unavailable(message: impl fmt::Display) -> Self {
        Self::StoreUnavailable(message.to_string())
    }

    /// Classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::AlreadyCancelled(_) => ErrorKind::AlreadyCancelled,
            Self::AlreadyRegistered { .. } => ErrorKind::AlreadyRegistered,
            Self::AlreadyMarked { .. } => ErrorKind::AlreadyMarked,
            Self::AlreadySubmitted { .. } => ErrorKind::AlreadySubmitted,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::EventCancelled(_) => ErrorKind::EventCancelled,
            Self::NotRegistered { .. } => ErrorKind::NotRegistered,
            Self::NotAttended { .. } => ErrorKind::NotAttended,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Whether a caller may safely retry the failed operation.
    ///
    /// Only store outages qualify. Every write is keyed by its
    /// (event, student) pair, so a retry after an ambiguous commit surfaces
    /// as an `Already*` error rather than a second record.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

/// Result alias used throughout the ledger crates.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = LedgerError::AlreadyRegistered {
            event_id: EventId::new(1),
            student_id: StudentId::new(2),
        };
        assert_eq!(err.kind(), ErrorKind::AlreadyRegistered);
        assert_eq!(
            err.to_string(),
            "Student 2 is already registered for event 1"
        );
    }

    #[test]
    fn test_only_store_unavailable_is_retryable() {
        assert!(LedgerError::store_unavailable("connection reset").is_retryable());
        assert!(!LedgerError::EventCancelled(EventId::new(1)).is_retryable());
        assert!(!LedgerError::invalid_argument("rating").is_retryable());
    }

    #[test]
    fn test_not_found_display() {
        let err = LedgerError::not_found("event", 42);
        assert_eq!(err.to_string(), "event 42 not found");
        assert_eq!(err.kind().as_str(), "not_found");
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::CapacityExceeded).unwrap();
        assert_eq!(json, "\"capacity_exceeded\"");
    }
}
