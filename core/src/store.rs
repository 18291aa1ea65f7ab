//! Storage abstraction for the ledger.
//!
//! A [`LedgerStore`] owns every persisted record and is responsible for the
//! atomicity of each write: capacity reservation, duplicate detection and the
//! record insert happen under one per-event critical section (a mutex in
//! memory, a row lock in Postgres).
//!
//! # Trait object
//!
//! Methods return [`StoreFuture`] instead of using `async fn` so the service
//! can hold an `Arc<dyn LedgerStore>` and switch backends at startup.

use crate::error::Result;
use crate::types::{
    Attendance, College, CollegeId, Event, EventId, Feedback, NewEvent, NewFeedback, Registration,
    Student, StudentId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`LedgerStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// College filter applied to listings and reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(Option<CollegeId>);

impl Scope {
    /// Every college.
    #[must_use]
    pub const fn all() -> Self {
        Self(None)
    }

    /// A single college.
    #[must_use]
    pub const fn college(college_id: CollegeId) -> Self {
        Self(Some(college_id))
    }

    /// The college filter, if any.
    #[must_use]
    pub const fn college_id(&self) -> Option<CollegeId> {
        self.0
    }

    /// Whether an entity of `college_id` falls in the scope.
    #[must_use]
    pub fn contains(&self, college_id: CollegeId) -> bool {
        self.0.is_none_or(|scope| scope == college_id)
    }
}

impl From<Option<CollegeId>> for Scope {
    fn from(college_id: Option<CollegeId>) -> Self {
        Self(college_id)
    }
}

/// Ordering rules between ledger records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPolicy {
    /// Attendance needs an existing registration
    pub require_registration_for_attendance: bool,
    /// Feedback needs an existing attendance record
    pub require_attendance_for_feedback: bool,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            require_registration_for_attendance: false,
            require_attendance_for_feedback: true,
        }
    }
}

/// One event with every record attached to it, as of one committed state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecords {
    /// The event and its counters
    pub event: Event,
    /// Registrations, ordered by student id
    pub registrations: Vec<Registration>,
    /// Attendance records, ordered by student id
    pub attendance: Vec<Attendance>,
    /// Feedback, ordered by student id
    pub feedback: Vec<Feedback>,
}

/// Input of the reporting computations.
///
/// Each [`EventRecords`] entry is internally consistent. Different events may
/// have been copied at slightly different instants.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// In-scope events ordered by id
    pub events: Vec<EventRecords>,
    /// In-scope students ordered by id
    pub students: Vec<Student>,
}

/// Persistence for colleges, students, events and ledger records.
///
/// Implementations must serialize writes per event and keep
/// `registration_count <= capacity` at every committed state. Infrastructure
/// failures are reported as [`LedgerError::StoreUnavailable`](crate::LedgerError::StoreUnavailable).
pub trait LedgerStore: Send + Sync {
    /// Check that the store is reachable.
    fn ping(&self) -> StoreFuture<'_, ()>;

    /// Insert a college with a fresh id.
    fn insert_college(&self, name: String) -> StoreFuture<'_, College>;

    /// Look up a college.
    fn get_college(&self, college_id: CollegeId) -> StoreFuture<'_, Option<College>>;

    /// All colleges ordered by id.
    fn list_colleges(&self) -> StoreFuture<'_, Vec<College>>;

    /// Insert a student.
    ///
    /// Fails with `NotFound` when the college does not exist.
    fn insert_student(&self, name: String, college_id: CollegeId) -> StoreFuture<'_, Student>;

    /// Look up a student.
    fn get_student(&self, student_id: StudentId) -> StoreFuture<'_, Option<Student>>;

    /// Students in scope ordered by id.
    fn list_students(&self, scope: Scope) -> StoreFuture<'_, Vec<Student>>;

    /// Insert an open event with zeroed counters.
    ///
    /// Fails with `NotFound` when the college does not exist.
    fn insert_event(&self, event: NewEvent, created_at: DateTime<Utc>) -> StoreFuture<'_, Event>;

    /// Look up an event with its live counters.
    fn get_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>>;

    /// Events in scope ordered by id, cancelled ones included.
    fn list_events(&self, scope: Scope) -> StoreFuture<'_, Vec<Event>>;

    /// Mark an event cancelled and return it.
    ///
    /// Fails with `NotFound` or `AlreadyCancelled`.
    fn cancel_event(&self, event_id: EventId) -> StoreFuture<'_, Event>;

    /// Register a student, reserving one seat.
    ///
    /// Fails with `NotFound`, `EventCancelled`, `AlreadyRegistered` or
    /// `CapacityExceeded`; a failure persists nothing.
    fn register(
        &self,
        event_id: EventId,
        student_id: StudentId,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, Registration>;

    /// Registrations of one event ordered by student id.
    ///
    /// Fails with `NotFound` for an unknown event.
    fn list_registrations(&self, event_id: EventId) -> StoreFuture<'_, Vec<Registration>>;

    /// Record attendance.
    ///
    /// Fails with `NotFound`, `EventCancelled`, `AlreadyMarked`, or
    /// `NotRegistered` when the policy requires a registration.
    fn mark_attendance(
        &self,
        event_id: EventId,
        student_id: StudentId,
        at: DateTime<Utc>,
        policy: LedgerPolicy,
    ) -> StoreFuture<'_, Attendance>;

    /// Store feedback.
    ///
    /// Fails with `NotFound`, `AlreadySubmitted`, or `NotAttended` when the
    /// policy requires attendance.
    fn submit_feedback(
        &self,
        feedback: NewFeedback,
        at: DateTime<Utc>,
        policy: LedgerPolicy,
    ) -> StoreFuture<'_, Feedback>;

    /// Copy the committed records of every event and student in scope.
    fn snapshot(&self, scope: Scope) -> StoreFuture<'_, LedgerSnapshot>;
}
