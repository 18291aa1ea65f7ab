//! Reporting aggregator operations.
//!
//! Each report reads one snapshot and hands it to the pure computations in
//! [`campus_ledger_core::reports`]. Every event in a snapshot is copied under
//! its own lock, so no row ever reflects a half-applied write.

use super::EventLedger;
use crate::metrics::LedgerMetrics;
use campus_ledger_core::reports::{
    self, ActiveStudentRow, DEFAULT_ACTIVE_STUDENTS_LIMIT, DEFAULT_TOP_EVENTS_LIMIT,
    FeedbackSummaryRow, InactiveStudentRow, PopularityRow,
};
use campus_ledger_core::store::{LedgerSnapshot, Scope};
use campus_ledger_core::Result;
use std::time::Instant;

impl EventLedger {
    async fn snapshot(&self, operation: &'static str, scope: Scope) -> Result<LedgerSnapshot> {
        let started = Instant::now();
        let snapshot = self.read(operation, || self.store.snapshot(scope)).await?;
        LedgerMetrics::record_duration(operation, started.elapsed());
        tracing::debug!(
            operation,
            events = snapshot.events.len(),
            students = snapshot.students.len(),
            "Snapshot taken"
        );
        Ok(snapshot)
    }

    /// Registrations per event, most popular first.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be read.
    pub async fn event_popularity(&self, scope: Scope) -> Result<Vec<PopularityRow>> {
        let snapshot = self.snapshot("event_popularity", scope).await?;
        Ok(reports::event_popularity(&snapshot))
    }

    /// Students ranked by distinct events attended (default limit 5).
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-positive limit.
    pub async fn top_active_students(
        &self,
        scope: Scope,
        limit: Option<i64>,
    ) -> Result<Vec<ActiveStudentRow>> {
        let limit = reports::resolve_limit(limit, DEFAULT_ACTIVE_STUDENTS_LIMIT)?;
        let snapshot = self.snapshot("top_active_students", scope).await?;
        Ok(reports::top_active_students(&snapshot, limit))
    }

    /// Mean rating and feedback count per event.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be read.
    pub async fn average_feedback(&self, scope: Scope) -> Result<Vec<FeedbackSummaryRow>> {
        let snapshot = self.snapshot("average_feedback", scope).await?;
        Ok(reports::average_feedback(&snapshot))
    }

    /// Best rated events (default limit 3).
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-positive limit.
    pub async fn top_events_by_feedback(
        &self,
        scope: Scope,
        limit: Option<i64>,
    ) -> Result<Vec<FeedbackSummaryRow>> {
        let limit = reports::resolve_limit(limit, DEFAULT_TOP_EVENTS_LIMIT)?;
        let snapshot = self.snapshot("top_events_by_feedback", scope).await?;
        Ok(reports::top_events_by_feedback(&snapshot, limit))
    }

    /// Students of the scope without a single registration, at any college.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be read.
    pub async fn inactive_students(&self, scope: Scope) -> Result<Vec<InactiveStudentRow>> {
        let snapshot = self.snapshot("inactive_students", Scope::all()).await?;
        Ok(reports::inactive_students(&snapshot, scope))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ledger::EventDraft;
    use crate::memory::InMemoryLedgerStore;
    use campus_ledger_core::{ErrorKind, EventId, EventType, Principal, Student};
    use campus_ledger_testing::test_clock;
    use std::sync::Arc;

    struct Campus {
        ledger: EventLedger,
        students: Vec<Student>,
        events: Vec<EventId>,
    }

    async fn campus() -> Campus {
        let ledger = EventLedger::new(Arc::new(InMemoryLedgerStore::new()), Arc::new(test_clock()));
        let admin = Principal::admin();
        let north = ledger.create_college(&admin, "North").await.unwrap();
        let south = ledger.create_college(&admin, "South").await.unwrap();

        let mut students = Vec::new();
        for (name, college) in [("Asha", north.id), ("Ben", north.id), ("Chen", south.id)] {
            students.push(ledger.create_student(&admin, name, college).await.unwrap());
        }

        let mut events = Vec::new();
        for (title, college) in [("Talk", north.id), ("Lab", north.id), ("Jam", south.id)] {
            let event = ledger
                .create_event(
                    &admin,
                    EventDraft {
                        title: title.into(),
                        event_type: EventType::Workshop,
                        capacity: None,
                        college_id: Some(college),
                    },
                )
                .await
                .unwrap();
            events.push(event.id);
        }
        Campus {
            ledger,
            students,
            events,
        }
    }

    #[tokio::test]
    async fn test_top_active_students_limit_one() {
        let Campus {
            ledger,
            students,
            events,
        } = campus().await;
        let asha = Principal::student(students[0].id);
        let ben = Principal::student(students[1].id);
        for event in &events {
            ledger.mark_attendance(&asha, *event, None).await.unwrap();
        }
        ledger.mark_attendance(&ben, events[0], None).await.unwrap();

        let rows = ledger.top_active_students(Scope::all(), Some(1)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].student_id, students[0].id);
        assert_eq!(rows[0].events_attended, 3);

        let err = ledger
            .top_active_students(Scope::all(), Some(0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_scoped_popularity_excludes_other_colleges() {
        let Campus {
            ledger,
            students,
            events,
        } = campus().await;
        let chen = Principal::student(students[2].id);
        ledger.register(&chen, events[2], None).await.unwrap();

        let north = ledger
            .event_popularity(Scope::college(campus_ledger_core::CollegeId::new(1)))
            .await
            .unwrap();
        assert_eq!(north.len(), 2);
        assert!(north.iter().all(|row| row.registrations == 0));

        let all = ledger.event_popularity(Scope::all()).await.unwrap();
        assert_eq!(all[0].event_id, events[2]);
        assert_eq!(all[0].registrations, 1);
    }

    #[tokio::test]
    async fn test_average_feedback_end_to_end() {
        let Campus {
            ledger,
            students,
            events,
        } = campus().await;
        for (student, rating) in [(&students[0], 3), (&students[1], 5)] {
            let me = Principal::student(student.id);
            ledger.mark_attendance(&me, events[0], None).await.unwrap();
            ledger
                .submit_feedback(&me, events[0], None, rating, None)
                .await
                .unwrap();
        }

        let rows = ledger.average_feedback(Scope::all()).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].average_rating, Some(4.0));
        assert_eq!(rows[0].feedback_count, 2);
        assert_eq!(rows[1].average_rating, None);
        assert_eq!(rows[1].feedback_count, 0);

        let top = ledger.top_events_by_feedback(Scope::all(), None).await.unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].event_id, events[0]);
    }

    #[tokio::test]
    async fn test_inactive_students_counts_cross_college_registrations() {
        let Campus {
            ledger,
            students,
            events,
        } = campus().await;
        // Asha (North) registers for the South event.
        ledger
            .register(&Principal::student(students[0].id), events[2], None)
            .await
            .unwrap();

        let north = ledger
            .inactive_students(Scope::college(campus_ledger_core::CollegeId::new(1)))
            .await
            .unwrap();
        let ids: Vec<_> = north.iter().map(|row| row.student_id).collect();
        assert_eq!(ids, vec![students[1].id]);
    }
}
