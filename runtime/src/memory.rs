//! In-memory [`LedgerStore`].
//!
//! Each event owns a `tokio::sync::Mutex` around its ledger (the event plus
//! its registration, attendance and feedback sets). Writes to one event
//! serialize on that mutex; writes to different events never contend.
//!
//! The event index is a `std::sync::RwLock` held only long enough to clone
//! the `Arc` of one entry, never across an `.await`.

use campus_ledger_core::store::{EventRecords, LedgerSnapshot, Scope, StoreFuture};
use campus_ledger_core::{
    Attendance, College, CollegeId, Event, EventId, Feedback, LedgerError, LedgerPolicy,
    LedgerStore, NewEvent, NewFeedback, Registration, Result, Student, StudentId,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;

/// Everything recorded against one event.
#[derive(Debug)]
struct EventEntry {
    event: Event,
    registrations: BTreeMap<StudentId, Registration>,
    attendance: BTreeMap<StudentId, Attendance>,
    feedback: BTreeMap<StudentId, Feedback>,
}

impl EventEntry {
    fn new(event: Event) -> Self {
        Self {
            event,
            registrations: BTreeMap::new(),
            attendance: BTreeMap::new(),
            feedback: BTreeMap::new(),
        }
    }

    fn records(&self) -> EventRecords {
        EventRecords {
            event: self.event.clone(),
            registrations: self.registrations.values().cloned().collect(),
            attendance: self.attendance.values().cloned().collect(),
            feedback: self.feedback.values().cloned().collect(),
        }
    }

    fn register(&mut self, student_id: StudentId, at: DateTime<Utc>) -> Result<Registration> {
        let event_id = self.event.id;
        self.event.ensure_open()?;
        if self.registrations.contains_key(&student_id) {
            return Err(LedgerError::AlreadyRegistered {
                event_id,
                student_id,
            });
        }

        let permit = self.event.reserve_capacity()?;
        let registration = Registration {
            event_id,
            student_id,
            created_at: at,
        };
        permit.commit();
        self.registrations.insert(student_id, registration.clone());
        Ok(registration)
    }

    fn mark_attendance(
        &mut self,
        student_id: StudentId,
        at: DateTime<Utc>,
        policy: LedgerPolicy,
    ) -> Result<Attendance> {
        let event_id = self.event.id;
        self.event.ensure_open()?;
        if self.attendance.contains_key(&student_id) {
            return Err(LedgerError::AlreadyMarked {
                event_id,
                student_id,
            });
        }
        if policy.require_registration_for_attendance
            && !self.registrations.contains_key(&student_id)
        {
            return Err(LedgerError::NotRegistered {
                event_id,
                student_id,
            });
        }

        self.event.record_attendance()?;
        let attendance = Attendance {
            event_id,
            student_id,
            marked_at: at,
        };
        self.attendance.insert(student_id, attendance.clone());
        Ok(attendance)
    }

    fn submit_feedback(
        &mut self,
        feedback: NewFeedback,
        at: DateTime<Utc>,
        policy: LedgerPolicy,
    ) -> Result<Feedback> {
        let event_id = self.event.id;
        let student_id = feedback.student_id;
        if self.feedback.contains_key(&student_id) {
            return Err(LedgerError::AlreadySubmitted {
                event_id,
                student_id,
            });
        }
        if policy.require_attendance_for_feedback && !self.attendance.contains_key(&student_id) {
            return Err(LedgerError::NotAttended {
                event_id,
                student_id,
            });
        }

        let stored = feedback.into_feedback(at);
        self.feedback.insert(student_id, stored.clone());
        Ok(stored)
    }
}

/// Process-local ledger store.
///
/// Identifiers are assigned sequentially from 1 per entity kind.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    colleges: RwLock<BTreeMap<CollegeId, College>>,
    students: RwLock<BTreeMap<StudentId, Student>>,
    events: RwLock<BTreeMap<EventId, Arc<Mutex<EventEntry>>>>,
    next_college_id: AtomicI64,
    next_student_id: AtomicI64,
    next_event_id: AtomicI64,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| LedgerError::store_unavailable("in-memory index lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| LedgerError::store_unavailable("in-memory index lock poisoned"))
}

fn next_id(counter: &AtomicI64) -> i64 {
    counter.fetch_add(1, Ordering::Relaxed) + 1
}

impl InMemoryLedgerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self, event_id: EventId) -> Result<Arc<Mutex<EventEntry>>> {
        read(&self.events)?
            .get(&event_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("event", event_id))
    }

    fn ledgers(&self) -> Result<Vec<Arc<Mutex<EventEntry>>>> {
        Ok(read(&self.events)?.values().cloned().collect())
    }

    fn college_exists(&self, college_id: CollegeId) -> Result<()> {
        if read(&self.colleges)?.contains_key(&college_id) {
            Ok(())
        } else {
            Err(LedgerError::not_found("college", college_id))
        }
    }

    fn students_in(&self, scope: Scope) -> Result<Vec<Student>> {
        Ok(read(&self.students)?
            .values()
            .filter(|s| scope.contains(s.college_id))
            .cloned()
            .collect())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { read(&self.events).map(|_| ()) })
    }

    fn insert_college(&self, name: String) -> StoreFuture<'_, College> {
        Box::pin(async move {
            let mut colleges = write(&self.colleges)?;
            let college = College {
                id: CollegeId::new(next_id(&self.next_college_id)),
                name,
            };
            colleges.insert(college.id, college.clone());
            Ok(college)
        })
    }

    fn get_college(&self, college_id: CollegeId) -> StoreFuture<'_, Option<College>> {
        Box::pin(async move { Ok(read(&self.colleges)?.get(&college_id).cloned()) })
    }

    fn list_colleges(&self) -> StoreFuture<'_, Vec<College>> {
        Box::pin(async move { Ok(read(&self.colleges)?.values().cloned().collect()) })
    }

    fn insert_student(&self, name: String, college_id: CollegeId) -> StoreFuture<'_, Student> {
        Box::pin(async move {
            self.college_exists(college_id)?;
            let mut students = write(&self.students)?;
            let student = Student {
                id: StudentId::new(next_id(&self.next_student_id)),
                name,
                college_id,
            };
            students.insert(student.id, student.clone());
            Ok(student)
        })
    }

    fn get_student(&self, student_id: StudentId) -> StoreFuture<'_, Option<Student>> {
        Box::pin(async move { Ok(read(&self.students)?.get(&student_id).cloned()) })
    }

    fn list_students(&self, scope: Scope) -> StoreFuture<'_, Vec<Student>> {
        Box::pin(async move { self.students_in(scope) })
    }

    fn insert_event(&self, event: NewEvent, created_at: DateTime<Utc>) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            self.college_exists(event.college_id)?;
            let mut events = write(&self.events)?;
            let event = Event::open(
                EventId::new(next_id(&self.next_event_id)),
                event,
                created_at,
            );
            events.insert(event.id, Arc::new(Mutex::new(EventEntry::new(event.clone()))));
            Ok(event)
        })
    }

    fn get_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let ledger = read(&self.events)?.get(&event_id).cloned();
            match ledger {
                Some(ledger) => Ok(Some(ledger.lock().await.event.clone())),
                None => Ok(None),
            }
        })
    }

    fn list_events(&self, scope: Scope) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let mut events = Vec::new();
            for ledger in self.ledgers()? {
                let ledger = ledger.lock().await;
                if scope.contains(ledger.event.college_id) {
                    events.push(ledger.event.clone());
                }
            }
            Ok(events)
        })
    }

    fn cancel_event(&self, event_id: EventId) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let ledger = self.ledger(event_id)?;
            let mut ledger = ledger.lock().await;
            ledger.event.cancel()?;
            Ok(ledger.event.clone())
        })
    }

    fn register(
        &self,
        event_id: EventId,
        student_id: StudentId,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, Registration> {
        Box::pin(async move {
            let ledger = self.ledger(event_id)?;
            let mut ledger = ledger.lock().await;
            ledger.register(student_id, at)
        })
    }

    fn list_registrations(&self, event_id: EventId) -> StoreFuture<'_, Vec<Registration>> {
        Box::pin(async move {
            let ledger = self.ledger(event_id)?;
            let ledger = ledger.lock().await;
            Ok(ledger.registrations.values().cloned().collect())
        })
    }

    fn mark_attendance(
        &self,
        event_id: EventId,
        student_id: StudentId,
        at: DateTime<Utc>,
        policy: LedgerPolicy,
    ) -> StoreFuture<'_, Attendance> {
        Box::pin(async move {
            let ledger = self.ledger(event_id)?;
            let mut ledger = ledger.lock().await;
            ledger.mark_attendance(student_id, at, policy)
        })
    }

    fn submit_feedback(
        &self,
        feedback: NewFeedback,
        at: DateTime<Utc>,
        policy: LedgerPolicy,
    ) -> StoreFuture<'_, Feedback> {
        Box::pin(async move {
            let ledger = self.ledger(feedback.event_id)?;
            let mut ledger = ledger.lock().await;
            ledger.submit_feedback(feedback, at, policy)
        })
    }

    fn snapshot(&self, scope: Scope) -> StoreFuture<'_, LedgerSnapshot> {
        Box::pin(async move {
            let mut events = Vec::new();
            for ledger in self.ledgers()? {
                let ledger = ledger.lock().await;
                if scope.contains(ledger.event.college_id) {
                    events.push(ledger.records());
                }
            }
            Ok(LedgerSnapshot {
                events,
                students: self.students_in(scope)?,
            })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use campus_ledger_core::{Capacity, ErrorKind, EventType, Rating};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    async fn store_with_event(capacity: i64) -> (InMemoryLedgerStore, EventId) {
        let store = InMemoryLedgerStore::new();
        let college = store.insert_college("North Campus".into()).await.unwrap();
        let new_event = NewEvent::new(
            "Intro to Rust",
            EventType::Workshop,
            Capacity::try_new(capacity).unwrap(),
            college.id,
        )
        .unwrap();
        let event = store.insert_event(new_event, at()).await.unwrap();
        (store, event.id)
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = InMemoryLedgerStore::new();
        let a = store.insert_college("A".into()).await.unwrap();
        let b = store.insert_college("B".into()).await.unwrap();
        assert_eq!(a.id, CollegeId::new(1));
        assert_eq!(b.id, CollegeId::new(2));
    }

    #[tokio::test]
    async fn test_event_requires_known_college() {
        let store = InMemoryLedgerStore::new();
        let new_event = NewEvent::new(
            "Orphan",
            EventType::Other,
            Capacity::DEFAULT,
            CollegeId::new(99),
        )
        .unwrap();
        let err = store.insert_event(new_event, at()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_register_until_full() {
        let (store, event_id) = store_with_event(1).await;
        store.register(event_id, StudentId::new(1), at()).await.unwrap();

        let err = store
            .register(event_id, StudentId::new(2), at())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);

        let event = store.get_event(event_id).await.unwrap().unwrap();
        assert_eq!(event.registration_count, 1);
        assert_eq!(store.list_registrations(event_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_count() {
        let (store, event_id) = store_with_event(5).await;
        store.register(event_id, StudentId::new(1), at()).await.unwrap();
        let err = store
            .register(event_id, StudentId::new(1), at())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyRegistered);
        let event = store.get_event(event_id).await.unwrap().unwrap();
        assert_eq!(event.registration_count, 1);
    }

    #[tokio::test]
    async fn test_cancelled_event_rejects_writes() {
        let (store, event_id) = store_with_event(5).await;
        store.cancel_event(event_id).await.unwrap();

        let err = store.cancel_event(event_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyCancelled);

        let err = store
            .register(event_id, StudentId::new(1), at())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EventCancelled);

        let err = store
            .mark_attendance(event_id, StudentId::new(1), at(), LedgerPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EventCancelled);
    }

    #[tokio::test]
    async fn test_attendance_policy() {
        let (store, event_id) = store_with_event(5).await;
        let strict = LedgerPolicy {
            require_registration_for_attendance: true,
            ..LedgerPolicy::default()
        };

        let err = store
            .mark_attendance(event_id, StudentId::new(1), at(), strict)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotRegistered);

        store
            .mark_attendance(event_id, StudentId::new(1), at(), LedgerPolicy::default())
            .await
            .unwrap();
        let err = store
            .mark_attendance(event_id, StudentId::new(1), at(), LedgerPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyMarked);

        let event = store.get_event(event_id).await.unwrap().unwrap();
        assert_eq!(event.attendance_count, 1);
    }

    #[tokio::test]
    async fn test_feedback_requires_attendance_by_default() {
        let (store, event_id) = store_with_event(5).await;
        let student = StudentId::new(1);
        let feedback = NewFeedback::new(event_id, student, Rating::try_new(4).unwrap(), None).unwrap();

        let err = store
            .submit_feedback(feedback.clone(), at(), LedgerPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAttended);

        store
            .mark_attendance(event_id, student, at(), LedgerPolicy::default())
            .await
            .unwrap();
        store
            .submit_feedback(feedback.clone(), at(), LedgerPolicy::default())
            .await
            .unwrap();
        let err = store
            .submit_feedback(feedback, at(), LedgerPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadySubmitted);
    }

    #[tokio::test]
    async fn test_snapshot_respects_scope() {
        let (store, event_id) = store_with_event(5).await;
        let other = store.insert_college("South Campus".into()).await.unwrap();
        store.insert_student("Asha".into(), CollegeId::new(1)).await.unwrap();
        store.insert_student("Ravi".into(), other.id).await.unwrap();
        store.register(event_id, StudentId::new(1), at()).await.unwrap();

        let all = store.snapshot(Scope::all()).await.unwrap();
        assert_eq!(all.events.len(), 1);
        assert_eq!(all.students.len(), 2);

        let south = store.snapshot(Scope::college(other.id)).await.unwrap();
        assert!(south.events.is_empty());
        assert_eq!(south.students.len(), 1);
    }

    proptest::proptest! {
        #[test]
        fn registration_count_never_exceeds_capacity(
            capacity in campus_ledger_testing::properties::small_capacity(),
            attempts in proptest::collection::vec(1i64..=24, 0..48),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let (store, event_id) = store_with_event(capacity).await;
                let mut accepted = std::collections::BTreeSet::new();
                for student in attempts {
                    if store.register(event_id, StudentId::new(student), at()).await.is_ok() {
                        proptest::prop_assert!(accepted.insert(student));
                    }
                }

                let event = store.get_event(event_id).await.unwrap().unwrap();
                proptest::prop_assert!(i64::from(event.registration_count) <= capacity);
                proptest::prop_assert_eq!(event.registration_count as usize, accepted.len());
                proptest::prop_assert_eq!(
                    store.list_registrations(event_id).await.unwrap().len(),
                    accepted.len()
                );
                Ok(())
            })?;
        }
    }
}
