//! Registration ledger operations.

use super::EventLedger;
use crate::metrics::{LedgerMetrics, outcome_label};
use campus_ledger_core::{Attendance, EventId, Principal, Registration, Result, StudentId};
use std::time::Instant;

impl EventLedger {
    /// Register a student for an event.
    ///
    /// Students register themselves; admins name the student. Capacity is
    /// reserved and the record persisted under the event's lock, so at most
    /// `capacity` concurrent callers win.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` / `InvalidArgument` from subject resolution
    /// - `NotFound` for an unknown event or student
    /// - `EventCancelled`, `AlreadyRegistered` or `CapacityExceeded`
    #[tracing::instrument(skip(self))]
    pub async fn register(
        &self,
        principal: &Principal,
        event_id: EventId,
        student_id: Option<StudentId>,
    ) -> Result<Registration> {
        let started = Instant::now();
        let result = self.register_inner(principal, event_id, student_id).await;
        LedgerMetrics::record_duration("register", started.elapsed());
        LedgerMetrics::record_registration(outcome_label(&result));

        match &result {
            Ok(registration) => tracing::info!(
                event_id = %registration.event_id,
                student_id = %registration.student_id,
                "Registration accepted"
            ),
            Err(err) => tracing::debug!(kind = %err.kind(), error = %err, "Registration rejected"),
        }
        result
    }

    async fn register_inner(
        &self,
        principal: &Principal,
        event_id: EventId,
        student_id: Option<StudentId>,
    ) -> Result<Registration> {
        let subject = principal.resolve_subject(student_id)?;
        self.existing_student(subject).await?;
        self.store.register(event_id, subject, self.clock.now()).await
    }

    /// Record that a student attended an event.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` / `InvalidArgument` from subject resolution
    /// - `NotFound` for an unknown event or student
    /// - `EventCancelled` or `AlreadyMarked`
    /// - `NotRegistered` when the policy requires a registration
    #[tracing::instrument(skip(self))]
    pub async fn mark_attendance(
        &self,
        principal: &Principal,
        event_id: EventId,
        student_id: Option<StudentId>,
    ) -> Result<Attendance> {
        let started = Instant::now();
        let result = self.mark_attendance_inner(principal, event_id, student_id).await;
        LedgerMetrics::record_duration("mark_attendance", started.elapsed());
        LedgerMetrics::record_attendance(outcome_label(&result));

        match &result {
            Ok(attendance) => tracing::info!(
                event_id = %attendance.event_id,
                student_id = %attendance.student_id,
                "Attendance marked"
            ),
            Err(err) => tracing::debug!(kind = %err.kind(), error = %err, "Attendance rejected"),
        }
        result
    }

    async fn mark_attendance_inner(
        &self,
        principal: &Principal,
        event_id: EventId,
        student_id: Option<StudentId>,
    ) -> Result<Attendance> {
        let subject = principal.resolve_subject(student_id)?;
        self.existing_student(subject).await?;
        self.store
            .mark_attendance(event_id, subject, self.clock.now(), self.policy)
            .await
    }

    /// Registrations of one event ordered by student id. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for a non-admin and `NotFound` for an unknown
    /// event.
    pub async fn list_registrations(
        &self,
        principal: &Principal,
        event_id: EventId,
    ) -> Result<Vec<Registration>> {
        principal.require_admin()?;
        self.read("list_registrations", || {
            self.store.list_registrations(event_id)
        })
        .await
    }
}
