//! Feedback store operations.

use super::EventLedger;
use crate::metrics::{LedgerMetrics, outcome_label};
use campus_ledger_core::{EventId, Feedback, NewFeedback, Principal, Rating, Result, StudentId};
use std::time::Instant;

impl EventLedger {
    /// Submit a rating (1-5) with optional comments. Students only, for
    /// themselves.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` for an admin, or a student naming someone else
    /// - `InvalidArgument` for a rating outside 1-5 or overlong comments
    /// - `NotFound` for an unknown event or student
    /// - `AlreadySubmitted` on a second submission
    /// - `NotAttended` when the policy requires attendance
    #[tracing::instrument(skip(self, comments))]
    pub async fn submit_feedback(
        &self,
        principal: &Principal,
        event_id: EventId,
        student_id: Option<StudentId>,
        rating: i64,
        comments: Option<&str>,
    ) -> Result<Feedback> {
        let started = Instant::now();
        let result = self
            .submit_feedback_inner(principal, event_id, student_id, rating, comments)
            .await;
        LedgerMetrics::record_duration("submit_feedback", started.elapsed());
        LedgerMetrics::record_feedback(outcome_label(&result));

        match &result {
            Ok(feedback) => tracing::info!(
                event_id = %feedback.event_id,
                student_id = %feedback.student_id,
                rating = feedback.rating.get(),
                "Feedback stored"
            ),
            Err(err) => tracing::debug!(kind = %err.kind(), error = %err, "Feedback rejected"),
        }
        result
    }

    async fn submit_feedback_inner(
        &self,
        principal: &Principal,
        event_id: EventId,
        student_id: Option<StudentId>,
        rating: i64,
        comments: Option<&str>,
    ) -> Result<Feedback> {
        principal.require_student()?;
        let subject = principal.resolve_subject(student_id)?;
        let feedback = NewFeedback::new(event_id, subject, Rating::try_new(rating)?, comments)?;
        self.existing_student(subject).await?;
        self.store
            .submit_feedback(feedback, self.clock.now(), self.policy)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ledger::EventDraft;
    use crate::memory::InMemoryLedgerStore;
    use campus_ledger_core::{ErrorKind, EventType, LedgerPolicy};
    use campus_ledger_testing::test_clock;
    use std::sync::Arc;

    async fn attended() -> (EventLedger, EventId, Principal) {
        let ledger = EventLedger::new(Arc::new(InMemoryLedgerStore::new()), Arc::new(test_clock()));
        let admin = Principal::admin();
        let college = ledger.create_college(&admin, "Main").await.unwrap();
        let student = ledger.create_student(&admin, "Asha", college.id).await.unwrap();
        let event = ledger
            .create_event(
                &admin,
                EventDraft {
                    title: "Design Fest".into(),
                    event_type: EventType::Fest,
                    capacity: None,
                    college_id: None,
                },
            )
            .await
            .unwrap();
        let me = Principal::student(student.id);
        ledger.register(&me, event.id, None).await.unwrap();
        ledger.mark_attendance(&me, event.id, None).await.unwrap();
        (ledger, event.id, me)
    }

    #[tokio::test]
    async fn test_rating_bounds() {
        let (ledger, event_id, me) = attended().await;
        for rating in [0, 6] {
            let err = ledger
                .submit_feedback(&me, event_id, None, rating, None)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        let stored = ledger
            .submit_feedback(&me, event_id, None, 5, Some("  great  "))
            .await
            .unwrap();
        assert_eq!(stored.rating.get(), 5);
        assert_eq!(stored.comments.as_deref(), Some("great"));
    }

    #[tokio::test]
    async fn test_rating_one_accepted() {
        let (ledger, event_id, me) = attended().await;
        let stored = ledger
            .submit_feedback(&me, event_id, None, 1, None)
            .await
            .unwrap();
        assert_eq!(stored.rating.get(), 1);
    }

    #[tokio::test]
    async fn test_resubmission_rejected() {
        let (ledger, event_id, me) = attended().await;
        ledger.submit_feedback(&me, event_id, None, 4, None).await.unwrap();
        let err = ledger
            .submit_feedback(&me, event_id, None, 2, Some("changed my mind"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadySubmitted);
    }

    #[tokio::test]
    async fn test_admin_cannot_submit() {
        let (ledger, event_id, me) = attended().await;
        let err = ledger
            .submit_feedback(&Principal::admin(), event_id, me.student_id(), 4, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_feedback_requires_attendance_unless_relaxed() {
        let (ledger, event_id, _) = attended().await;
        let admin = Principal::admin();
        let other = ledger
            .create_student(&admin, "Ben", campus_ledger_core::CollegeId::new(1))
            .await
            .unwrap();
        let them = Principal::student(other.id);

        let err = ledger
            .submit_feedback(&them, event_id, None, 3, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAttended);

        let relaxed = ledger.clone().with_policy(LedgerPolicy {
            require_attendance_for_feedback: false,
            ..LedgerPolicy::default()
        });
        relaxed.submit_feedback(&them, event_id, None, 3, None).await.unwrap();
    }
}
