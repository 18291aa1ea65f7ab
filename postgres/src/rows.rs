//! Row types and their conversion into domain records.

use campus_ledger_core::{
    Attendance, Capacity, College, CollegeId, Event, EventId, Feedback, LedgerError, Rating,
    Registration, Result, Student, StudentId,
};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Column list matching [`EventRow`].
pub(crate) const EVENT_COLUMNS: &str = "id, title, event_type, capacity, college_id, \
     is_cancelled, registration_count, attendance_count, created_at";

fn corrupt(table: &str, detail: impl std::fmt::Display) -> LedgerError {
    LedgerError::store_unavailable(format!("corrupt {table} row: {detail}"))
}

fn counter(table: &str, column: &str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| corrupt(table, format!("{column} = {value}")))
}

#[derive(FromRow)]
pub(crate) struct CollegeRow {
    id: i64,
    name: String,
}

impl From<CollegeRow> for College {
    fn from(row: CollegeRow) -> Self {
        Self {
            id: CollegeId::new(row.id),
            name: row.name,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct StudentRow {
    id: i64,
    name: String,
    college_id: i64,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Self {
            id: StudentId::new(row.id),
            name: row.name,
            college_id: CollegeId::new(row.college_id),
        }
    }
}

#[derive(FromRow)]
pub(crate) struct EventRow {
    id: i64,
    title: String,
    event_type: String,
    capacity: i64,
    college_id: i64,
    is_cancelled: bool,
    registration_count: i64,
    attendance_count: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = LedgerError;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(Self {
            id: EventId::new(row.id),
            event_type: row
                .event_type
                .parse()
                .map_err(|e| corrupt("events", e))?,
            capacity: Capacity::try_new(row.capacity).map_err(|e| corrupt("events", e))?,
            college_id: CollegeId::new(row.college_id),
            is_cancelled: row.is_cancelled,
            registration_count: counter("events", "registration_count", row.registration_count)?,
            attendance_count: counter("events", "attendance_count", row.attendance_count)?,
            created_at: row.created_at,
            title: row.title,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct RegistrationRow {
    event_id: i64,
    student_id: i64,
    created_at: DateTime<Utc>,
}

impl From<RegistrationRow> for Registration {
    fn from(row: RegistrationRow) -> Self {
        Self {
            event_id: EventId::new(row.event_id),
            student_id: StudentId::new(row.student_id),
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct AttendanceRow {
    event_id: i64,
    student_id: i64,
    marked_at: DateTime<Utc>,
}

impl From<AttendanceRow> for Attendance {
    fn from(row: AttendanceRow) -> Self {
        Self {
            event_id: EventId::new(row.event_id),
            student_id: StudentId::new(row.student_id),
            marked_at: row.marked_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct FeedbackRow {
    event_id: i64,
    student_id: i64,
    rating: i16,
    comments: Option<String>,
    submitted_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for Feedback {
    type Error = LedgerError;

    fn try_from(row: FeedbackRow) -> Result<Self> {
        Ok(Self {
            event_id: EventId::new(row.event_id),
            student_id: StudentId::new(row.student_id),
            rating: Rating::try_new(i64::from(row.rating)).map_err(|e| corrupt("feedback", e))?,
            comments: row.comments,
            submitted_at: row.submitted_at,
        })
    }
}
