//! `PostgreSQL` store for the campus event ledger.
//!
//! [`PostgresLedgerStore`] implements [`LedgerStore`] on a sqlx connection
//! pool. Every ledger write runs in one transaction that first takes a row
//! lock on the event (`SELECT ... FOR UPDATE`), so writes to the same event
//! are serialized across every service instance sharing the database:
//!
//! - Registration: open check, duplicate check, capacity check, insert and
//!   counter update commit together or not at all
//! - Attendance and feedback follow the same pattern
//! - Reports read a `REPEATABLE READ` snapshot
//!
//! Primary keys on `(event_id, student_id)` back the duplicate rules, so a
//! racing insert that slips past the lock still fails with the matching
//! `Already*` error rather than a second row.
//!
//! # Example
//!
//! ```ignore
//! use campus_ledger_postgres::PostgresLedgerStore;
//!
//! async fn example() -> campus_ledger_core::Result<()> {
//!     let store = PostgresLedgerStore::connect("postgres://localhost/ledger").await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use campus_ledger_core::store::{EventRecords, LedgerSnapshot, Scope, StoreFuture};
use campus_ledger_core::{
    Attendance, College, CollegeId, Event, EventId, Feedback, LedgerError, LedgerPolicy,
    LedgerStore, NewEvent, NewFeedback, Registration, Result, Student, StudentId,
};
use chrono::{DateTime, Utc};
use rows::{
    AttendanceRow, CollegeRow, EVENT_COLUMNS, EventRow, FeedbackRow, RegistrationRow, StudentRow,
};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use std::collections::BTreeMap;

mod rows;

/// Convert a driver error into `StoreUnavailable`, logging and counting it.
fn unavailable(operation: &'static str) -> impl FnOnce(sqlx::Error) -> LedgerError {
    move |err| {
        tracing::warn!(operation, error = %err, "Postgres operation failed");
        metrics::counter!("ledger.store.errors", "operation" => operation).increment(1);
        LedgerError::store_unavailable(err)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

/// Per-pair ledger tables.
#[derive(Clone, Copy)]
enum Ledger {
    Registrations,
    Attendance,
    Feedback,
}

impl Ledger {
    const fn exists_query(self) -> &'static str {
        match self {
            Self::Registrations => {
                "SELECT EXISTS (SELECT 1 FROM registrations WHERE event_id = $1 AND student_id = $2)"
            }
            Self::Attendance => {
                "SELECT EXISTS (SELECT 1 FROM attendance WHERE event_id = $1 AND student_id = $2)"
            }
            Self::Feedback => {
                "SELECT EXISTS (SELECT 1 FROM feedback WHERE event_id = $1 AND student_id = $2)"
            }
        }
    }
}

async fn has_record(
    conn: &mut PgConnection,
    ledger: Ledger,
    event_id: EventId,
    student_id: StudentId,
) -> Result<bool> {
    sqlx::query_scalar(ledger.exists_query())
        .bind(event_id.get())
        .bind(student_id.get())
        .fetch_one(&mut *conn)
        .await
        .map_err(unavailable("has_record"))
}

/// Lock the event row for the rest of the transaction.
async fn lock_event(conn: &mut PgConnection, event_id: EventId) -> Result<Event> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE");
    let row: Option<EventRow> = sqlx::query_as(&sql)
        .bind(event_id.get())
        .fetch_optional(&mut *conn)
        .await
        .map_err(unavailable("lock_event"))?;
    row.ok_or_else(|| LedgerError::not_found("event", event_id))?
        .try_into()
}

/// [`LedgerStore`] backed by a `PostgreSQL` database.
#[derive(Clone, Debug)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    /// Connect with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::StoreUnavailable`] if the database cannot be reached.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(unavailable("connect"))?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::StoreUnavailable`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::store_unavailable(format!("migration failed: {e}")))?;
        tracing::info!("Ledger schema is up to date");
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl LedgerStore for PostgresLedgerStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(unavailable("ping"))?;
            Ok(())
        })
    }

    fn insert_college(&self, name: String) -> StoreFuture<'_, College> {
        Box::pin(async move {
            let row: CollegeRow =
                sqlx::query_as("INSERT INTO colleges (name) VALUES ($1) RETURNING id, name")
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(unavailable("insert_college"))?;
            Ok(row.into())
        })
    }

    fn get_college(&self, college_id: CollegeId) -> StoreFuture<'_, Option<College>> {
        Box::pin(async move {
            let row: Option<CollegeRow> =
                sqlx::query_as("SELECT id, name FROM colleges WHERE id = $1")
                    .bind(college_id.get())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(unavailable("get_college"))?;
            Ok(row.map(College::from))
        })
    }

    fn list_colleges(&self) -> StoreFuture<'_, Vec<College>> {
        Box::pin(async move {
            let rows: Vec<CollegeRow> = sqlx::query_as("SELECT id, name FROM colleges ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(unavailable("list_colleges"))?;
            Ok(rows.into_iter().map(College::from).collect())
        })
    }

    fn insert_student(&self, name: String, college_id: CollegeId) -> StoreFuture<'_, Student> {
        Box::pin(async move {
            let row: StudentRow = sqlx::query_as(
                "INSERT INTO students (name, college_id) VALUES ($1, $2) \
                 RETURNING id, name, college_id",
            )
            .bind(name)
            .bind(college_id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    LedgerError::not_found("college", college_id)
                } else {
                    unavailable("insert_student")(e)
                }
            })?;
            Ok(row.into())
        })
    }

    fn get_student(&self, student_id: StudentId) -> StoreFuture<'_, Option<Student>> {
        Box::pin(async move {
            let row: Option<StudentRow> =
                sqlx::query_as("SELECT id, name, college_id FROM students WHERE id = $1")
                    .bind(student_id.get())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(unavailable("get_student"))?;
            Ok(row.map(Student::from))
        })
    }

    fn list_students(&self, scope: Scope) -> StoreFuture<'_, Vec<Student>> {
        Box::pin(async move {
            let rows: Vec<StudentRow> = sqlx::query_as(
                "SELECT id, name, college_id FROM students \
                 WHERE ($1::BIGINT IS NULL OR college_id = $1) ORDER BY id",
            )
            .bind(scope.college_id().map(CollegeId::get))
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable("list_students"))?;
            Ok(rows.into_iter().map(Student::from).collect())
        })
    }

    fn insert_event(&self, event: NewEvent, created_at: DateTime<Utc>) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let college_id = event.college_id;
            let sql = format!(
                "INSERT INTO events (title, event_type, capacity, college_id, created_at) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING {EVENT_COLUMNS}"
            );
            let row: EventRow = sqlx::query_as(&sql)
                .bind(event.title)
                .bind(event.event_type.as_str())
                .bind(i64::from(event.capacity.get()))
                .bind(college_id.get())
                .bind(created_at)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    if is_foreign_key_violation(&e) {
                        LedgerError::not_found("college", college_id)
                    } else {
                        unavailable("insert_event")(e)
                    }
                })?;
            let event = Event::try_from(row)?;
            tracing::debug!(event_id = %event.id, "Event row inserted");
            Ok(event)
        })
    }

    fn get_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
            let row: Option<EventRow> = sqlx::query_as(&sql)
                .bind(event_id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable("get_event"))?;
            row.map(Event::try_from).transpose()
        })
    }

    fn list_events(&self, scope: Scope) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM events \
                 WHERE ($1::BIGINT IS NULL OR college_id = $1) ORDER BY id"
            );
            let rows: Vec<EventRow> = sqlx::query_as(&sql)
                .bind(scope.college_id().map(CollegeId::get))
                .fetch_all(&self.pool)
                .await
                .map_err(unavailable("list_events"))?;
            rows.into_iter().map(Event::try_from).collect()
        })
    }

    fn cancel_event(&self, event_id: EventId) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(unavailable("cancel_event"))?;
            let mut event = lock_event(&mut tx, event_id).await?;
            event.cancel()?;

            sqlx::query("UPDATE events SET is_cancelled = TRUE WHERE id = $1")
                .bind(event_id.get())
                .execute(&mut *tx)
                .await
                .map_err(unavailable("cancel_event"))?;
            tx.commit().await.map_err(unavailable("cancel_event"))?;
            Ok(event)
        })
    }

    fn register(
        &self,
        event_id: EventId,
        student_id: StudentId,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, Registration> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(unavailable("register"))?;
            let mut event = lock_event(&mut tx, event_id).await?;
            event.ensure_open()?;
            let duplicate = LedgerError::AlreadyRegistered {
                event_id,
                student_id,
            };
            if has_record(&mut tx, Ledger::Registrations, event_id, student_id).await? {
                return Err(duplicate);
            }

            let capacity = event.capacity.get();
            let permit = event.reserve_capacity()?;
            let row: RegistrationRow = sqlx::query_as(
                "INSERT INTO registrations (event_id, student_id, created_at) \
                 VALUES ($1, $2, $3) RETURNING event_id, student_id, created_at",
            )
            .bind(event_id.get())
            .bind(student_id.get())
            .bind(at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    duplicate
                } else if is_foreign_key_violation(&e) {
                    LedgerError::not_found("student", student_id)
                } else {
                    unavailable("register")(e)
                }
            })?;

            let updated = sqlx::query(
                "UPDATE events SET registration_count = registration_count + 1 \
                 WHERE id = $1 AND NOT is_cancelled AND registration_count < capacity",
            )
            .bind(event_id.get())
            .execute(&mut *tx)
            .await
            .map_err(unavailable("register"))?;
            if updated.rows_affected() != 1 {
                return Err(LedgerError::CapacityExceeded { event_id, capacity });
            }

            tx.commit().await.map_err(unavailable("register"))?;
            permit.commit();
            Ok(row.into())
        })
    }

    fn list_registrations(&self, event_id: EventId) -> StoreFuture<'_, Vec<Registration>> {
        Box::pin(async move {
            let known: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM events WHERE id = $1)")
                .bind(event_id.get())
                .fetch_one(&self.pool)
                .await
                .map_err(unavailable("list_registrations"))?;
            if !known {
                return Err(LedgerError::not_found("event", event_id));
            }

            let rows: Vec<RegistrationRow> = sqlx::query_as(
                "SELECT event_id, student_id, created_at FROM registrations \
                 WHERE event_id = $1 ORDER BY student_id",
            )
            .bind(event_id.get())
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable("list_registrations"))?;
            Ok(rows.into_iter().map(Registration::from).collect())
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
            let mut tx = self.pool.begin().await.map_err(unavailable("mark_attendance"))?;
            let mut event = lock_event(&mut tx, event_id).await?;
            event.ensure_open()?;
            let duplicate = LedgerError::AlreadyMarked {
                event_id,
                student_id,
            };
            if has_record(&mut tx, Ledger::Attendance, event_id, student_id).await? {
                return Err(duplicate);
            }
            if policy.require_registration_for_attendance
                && !has_record(&mut tx, Ledger::Registrations, event_id, student_id).await?
            {
                return Err(LedgerError::NotRegistered {
                    event_id,
                    student_id,
                });
            }

            event.record_attendance()?;
            let row: AttendanceRow = sqlx::query_as(
                "INSERT INTO attendance (event_id, student_id, marked_at) \
                 VALUES ($1, $2, $3) RETURNING event_id, student_id, marked_at",
            )
            .bind(event_id.get())
            .bind(student_id.get())
            .bind(at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    duplicate
                } else if is_foreign_key_violation(&e) {
                    LedgerError::not_found("student", student_id)
                } else {
                    unavailable("mark_attendance")(e)
                }
            })?;

            sqlx::query("UPDATE events SET attendance_count = attendance_count + 1 WHERE id = $1")
                .bind(event_id.get())
                .execute(&mut *tx)
                .await
                .map_err(unavailable("mark_attendance"))?;
            tx.commit().await.map_err(unavailable("mark_attendance"))?;
            Ok(row.into())
        })
    }

    fn submit_feedback(
        &self,
        feedback: NewFeedback,
        at: DateTime<Utc>,
        policy: LedgerPolicy,
    ) -> StoreFuture<'_, Feedback> {
        Box::pin(async move {
            let event_id = feedback.event_id;
            let student_id = feedback.student_id;
            let mut tx = self.pool.begin().await.map_err(unavailable("submit_feedback"))?;
            lock_event(&mut tx, event_id).await?;
            let duplicate = LedgerError::AlreadySubmitted {
                event_id,
                student_id,
            };
            if has_record(&mut tx, Ledger::Feedback, event_id, student_id).await? {
                return Err(duplicate);
            }
            if policy.require_attendance_for_feedback
                && !has_record(&mut tx, Ledger::Attendance, event_id, student_id).await?
            {
                return Err(LedgerError::NotAttended {
                    event_id,
                    student_id,
                });
            }

            let row: FeedbackRow = sqlx::query_as(
                "INSERT INTO feedback (event_id, student_id, rating, comments, submitted_at) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING event_id, student_id, rating, comments, submitted_at",
            )
            .bind(event_id.get())
            .bind(student_id.get())
            .bind(i16::from(feedback.rating.get()))
            .bind(feedback.comments)
            .bind(at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    duplicate
                } else if is_foreign_key_violation(&e) {
                    LedgerError::not_found("student", student_id)
                } else {
                    unavailable("submit_feedback")(e)
                }
            })?;
            tx.commit().await.map_err(unavailable("submit_feedback"))?;
            row.try_into()
        })
    }

    fn snapshot(&self, scope: Scope) -> StoreFuture<'_, LedgerSnapshot> {
        Box::pin(async move {
            let college = scope.college_id().map(CollegeId::get);
            let mut tx = self.pool.begin().await.map_err(unavailable("snapshot"))?;
            sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
                .execute(&mut *tx)
                .await
                .map_err(unavailable("snapshot"))?;

            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM events \
                 WHERE ($1::BIGINT IS NULL OR college_id = $1) ORDER BY id"
            );
            let events: Vec<EventRow> = sqlx::query_as(&sql)
                .bind(college)
                .fetch_all(&mut *tx)
                .await
                .map_err(unavailable("snapshot"))?;

            let registrations: Vec<RegistrationRow> = sqlx::query_as(
                "SELECT r.event_id, r.student_id, r.created_at FROM registrations r \
                 JOIN events e ON e.id = r.event_id \
                 WHERE ($1::BIGINT IS NULL OR e.college_id = $1) \
                 ORDER BY r.event_id, r.student_id",
            )
            .bind(college)
            .fetch_all(&mut *tx)
            .await
            .map_err(unavailable("snapshot"))?;

            let attendance: Vec<AttendanceRow> = sqlx::query_as(
                "SELECT a.event_id, a.student_id, a.marked_at FROM attendance a \
                 JOIN events e ON e.id = a.event_id \
                 WHERE ($1::BIGINT IS NULL OR e.college_id = $1) \
                 ORDER BY a.event_id, a.student_id",
            )
            .bind(college)
            .fetch_all(&mut *tx)
            .await
            .map_err(unavailable("snapshot"))?;

            let feedback: Vec<FeedbackRow> = sqlx::query_as(
                "SELECT f.event_id, f.student_id, f.rating, f.comments, f.submitted_at \
                 FROM feedback f JOIN events e ON e.id = f.event_id \
                 WHERE ($1::BIGINT IS NULL OR e.college_id = $1) \
                 ORDER BY f.event_id, f.student_id",
            )
            .bind(college)
            .fetch_all(&mut *tx)
            .await
            .map_err(unavailable("snapshot"))?;

            let students: Vec<StudentRow> = sqlx::query_as(
                "SELECT id, name, college_id FROM students \
                 WHERE ($1::BIGINT IS NULL OR college_id = $1) ORDER BY id",
            )
            .bind(college)
            .fetch_all(&mut *tx)
            .await
            .map_err(unavailable("snapshot"))?;
            tx.commit().await.map_err(unavailable("snapshot"))?;

            let mut by_event = BTreeMap::new();
            for row in events {
                let event = Event::try_from(row)?;
                by_event.insert(
                    event.id,
                    EventRecords {
                        event,
                        registrations: Vec::new(),
                        attendance: Vec::new(),
                        feedback: Vec::new(),
                    },
                );
            }
            for registration in registrations.into_iter().map(Registration::from) {
                if let Some(records) = by_event.get_mut(&registration.event_id) {
                    records.registrations.push(registration);
                }
            }
            for attendance in attendance.into_iter().map(Attendance::from) {
                if let Some(records) = by_event.get_mut(&attendance.event_id) {
                    records.attendance.push(attendance);
                }
            }
            for row in feedback {
                let feedback = Feedback::try_from(row)?;
                if let Some(records) = by_event.get_mut(&feedback.event_id) {
                    records.feedback.push(feedback);
                }
            }

            Ok(LedgerSnapshot {
                events: by_event.into_values().collect(),
                students: students.into_iter().map(Student::from).collect(),
            })
        })
    }
}
