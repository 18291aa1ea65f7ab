//! Reporting aggregates.
//!
//! Pure functions over a [`LedgerSnapshot`]. They never touch a store, which
//! keeps every ordering and tie-break rule unit-testable without I/O.

use crate::error::{LedgerError, Result};
use crate::store::{LedgerSnapshot, Scope};
use crate::types::{EventId, EventType, StudentId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Default row limit of [`top_active_students`].
pub const DEFAULT_ACTIVE_STUDENTS_LIMIT: usize = 5;

/// Default row limit of [`top_events_by_feedback`].
pub const DEFAULT_TOP_EVENTS_LIMIT: usize = 3;

/// Registrations per event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularityRow {
    /// Event
    pub event_id: EventId,
    /// Event title
    pub title: String,
    /// Event type
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Number of registrations
    pub registrations: usize,
}

/// Attendance per student.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveStudentRow {
    /// Student
    pub student_id: StudentId,
    /// Student name
    pub name: String,
    /// Distinct events the student attended
    pub events_attended: usize,
}

/// Feedback aggregate per event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummaryRow {
    /// Event
    pub event_id: EventId,
    /// Event title
    pub title: String,
    /// Mean rating, `None` without feedback
    pub average_rating: Option<f64>,
    /// Number of feedback records
    pub feedback_count: usize,
}

/// A student without any registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactiveStudentRow {
    /// Student
    pub student_id: StudentId,
    /// Student name
    pub name: String,
}

/// Validate an optional caller-supplied limit.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidArgument`] for zero or negative limits.
pub fn resolve_limit(limit: Option<i64>, default: usize) -> Result<usize> {
    match limit {
        None => Ok(default),
        Some(value) => match usize::try_from(value) {
            Ok(v) if v > 0 => Ok(v),
            _ => Err(LedgerError::invalid_argument(format!(
                "limit must be a positive integer, got {value}"
            ))),
        },
    }
}

/// Registrations per event, most popular first, ties by event id.
#[must_use]
pub fn event_popularity(snapshot: &LedgerSnapshot) -> Vec<PopularityRow> {
    let mut rows: Vec<PopularityRow> = snapshot
        .events
        .iter()
        .map(|records| PopularityRow {
            event_id: records.event.id,
            title: records.event.title.clone(),
            event_type: records.event.event_type,
            registrations: records.registrations.len(),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.registrations
            .cmp(&a.registrations)
            .then(a.event_id.cmp(&b.event_id))
    });
    rows
}

/// Students with the most attended events.
///
/// Only students listed in the snapshot are ranked and students who attended
/// nothing are omitted.
#[must_use]
pub fn top_active_students(snapshot: &LedgerSnapshot, limit: usize) -> Vec<ActiveStudentRow> {
    let mut attended: BTreeMap<StudentId, BTreeSet<EventId>> = BTreeMap::new();
    for records in &snapshot.events {
        for attendance in &records.attendance {
            attended
                .entry(attendance.student_id)
                .or_default()
                .insert(attendance.event_id);
        }
    }

    let mut rows: Vec<ActiveStudentRow> = snapshot
        .students
        .iter()
        .filter_map(|student| {
            let events = attended.get(&student.id)?;
            Some(ActiveStudentRow {
                student_id: student.id,
                name: student.name.clone(),
                events_attended: events.len(),
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        b.events_attended
            .cmp(&a.events_attended)
            .then(a.student_id.cmp(&b.student_id))
    });
    rows.truncate(limit);
    rows
}

/// Mean rating and feedback count per event, ordered by event id.
#[must_use]
pub fn average_feedback(snapshot: &LedgerSnapshot) -> Vec<FeedbackSummaryRow> {
    let mut rows: Vec<FeedbackSummaryRow> = snapshot
        .events
        .iter()
        .map(|records| {
            let count = records.feedback.len();
            let total: u32 = records
                .feedback
                .iter()
                .map(|fb| u32::from(fb.rating.get()))
                .sum();
            #[allow(clippy::cast_precision_loss)]
            let average_rating = (count > 0).then(|| f64::from(total) / count as f64);
            FeedbackSummaryRow {
                event_id: records.event.id,
                title: records.event.title.clone(),
                average_rating,
                feedback_count: count,
            }
        })
        .collect();
    rows.sort_by_key(|row| row.event_id);
    rows
}

/// Best rated events first; events without feedback rank last.
#[must_use]
pub fn top_events_by_feedback(snapshot: &LedgerSnapshot, limit: usize) -> Vec<FeedbackSummaryRow> {
    let mut rows = average_feedback(snapshot);
    rows.sort_by(|a, b| {
        compare_averages_desc(a.average_rating, b.average_rating)
            .then(a.event_id.cmp(&b.event_id))
    });
    rows.truncate(limit);
    rows
}

fn compare_averages_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Students of `scope` that hold no registration on any event of the
/// snapshot, ordered by student id.
///
/// Pass an unscoped snapshot to treat registrations at other colleges'
/// events as activity.
#[must_use]
pub fn inactive_students(snapshot: &LedgerSnapshot, scope: Scope) -> Vec<InactiveStudentRow> {
    let registered: BTreeSet<StudentId> = snapshot
        .events
        .iter()
        .flat_map(|records| records.registrations.iter().map(|r| r.student_id))
        .collect();

    let mut rows: Vec<InactiveStudentRow> = snapshot
        .students
        .iter()
        .filter(|student| scope.contains(student.college_id) && !registered.contains(&student.id))
        .map(|student| InactiveStudentRow {
            student_id: student.id,
            name: student.name.clone(),
        })
        .collect();
    rows.sort_by_key(|row| row.student_id);
    rows
}
