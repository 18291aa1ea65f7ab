//! Fault injection for store outages.

use campus_ledger_core::store::{LedgerSnapshot, Scope, StoreFuture};
use campus_ledger_core::{
    Attendance, College, CollegeId, Event, EventId, Feedback, LedgerError, LedgerPolicy,
    LedgerStore, NewEvent, NewFeedback, Registration, Student, StudentId,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Wraps a store and fails calls with `StoreUnavailable` on demand.
///
/// Either a fixed number of upcoming calls fail ([`fail_next`](Self::fail_next))
/// or every call fails until the store is brought back
/// ([`set_down`](Self::set_down)).
pub struct UnavailableStore {
    inner: Arc<dyn LedgerStore>,
    down: AtomicBool,
    pending_failures: AtomicUsize,
    calls: AtomicUsize,
}

impl UnavailableStore {
    /// Wrap `inner`; initially healthy.
    #[must_use]
    pub fn new(inner: Arc<dyn LedgerStore>) -> Self {
        Self {
            inner,
            down: AtomicBool::new(false),
            pending_failures: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// A store that is down from the start.
    #[must_use]
    pub fn down(inner: Arc<dyn LedgerStore>) -> Self {
        let store = Self::new(inner);
        store.set_down(true);
        store
    }

    /// Fail the next `count` calls, then recover.
    pub fn fail_next(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Take the store down or bring it back.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Number of calls received, failed ones included.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn gate<'a, T: Send + 'a>(
        &'a self,
        call: impl FnOnce(&'a dyn LedgerStore) -> StoreFuture<'a, T>,
    ) -> StoreFuture<'a, T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected || self.down.load(Ordering::SeqCst) {
            Box::pin(async { Err(LedgerError::store_unavailable("injected outage")) })
        } else {
            call(self.inner.as_ref())
        }
    }
}

impl LedgerStore for UnavailableStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        self.gate(|s| s.ping())
    }

    fn insert_college(&self, name: String) -> StoreFuture<'_, College> {
        self.gate(|s| s.insert_college(name))
    }

    fn get_college(&self, college_id: CollegeId) -> StoreFuture<'_, Option<College>> {
        self.gate(|s| s.get_college(college_id))
    }

    fn list_colleges(&self) -> StoreFuture<'_, Vec<College>> {
        self.gate(|s| s.list_colleges())
    }

    fn insert_student(&self, name: String, college_id: CollegeId) -> StoreFuture<'_, Student> {
        self.gate(|s| s.insert_student(name, college_id))
    }

    fn get_student(&self, student_id: StudentId) -> StoreFuture<'_, Option<Student>> {
        self.gate(|s| s.get_student(student_id))
    }

    fn list_students(&self, scope: Scope) -> StoreFuture<'_, Vec<Student>> {
        self.gate(|s| s.list_students(scope))
    }

    fn insert_event(&self, event: NewEvent, created_at: DateTime<Utc>) -> StoreFuture<'_, Event> {
        self.gate(|s| s.insert_event(event, created_at))
    }

    fn get_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
        self.gate(|s| s.get_event(event_id))
    }

    fn list_events(&self, scope: Scope) -> StoreFuture<'_, Vec<Event>> {
        self.gate(|s| s.list_events(scope))
    }

    fn cancel_event(&self, event_id: EventId) -> StoreFuture<'_, Event> {
        self.gate(|s| s.cancel_event(event_id))
    }

    fn register(
        &self,
        event_id: EventId,
        student_id: StudentId,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, Registration> {
        self.gate(|s| s.register(event_id, student_id, at))
    }

    fn list_registrations(&self, event_id: EventId) -> StoreFuture<'_, Vec<Registration>> {
        self.gate(|s| s.list_registrations(event_id))
    }

    fn mark_attendance(
        &self,
        event_id: EventId,
        student_id: StudentId,
        at: DateTime<Utc>,
        policy: LedgerPolicy,
    ) -> StoreFuture<'_, Attendance> {
        self.gate(|s| s.mark_attendance(event_id, student_id, at, policy))
    }

    fn submit_feedback(
        &self,
        feedback: NewFeedback,
        at: DateTime<Utc>,
        policy: LedgerPolicy,
    ) -> StoreFuture<'_, Feedback> {
        self.gate(|s| s.submit_feedback(feedback, at, policy))
    }

    fn snapshot(&self, scope: Scope) -> StoreFuture<'_, LedgerSnapshot> {
        self.gate(|s| s.snapshot(scope))
    }
}
