//! Domain types for the campus event ledger.
//!
//! Identifiers are sequential integers assigned by the store, which gives the
//! reports a natural tie-breaking order. Value objects ([`Capacity`],
//! [`Rating`]) validate on construction so an invalid value never reaches a
//! store.

use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
    /// Wrap a raw identifier
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw identifier
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a student
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(i64);

impl StudentId {
    /// Wrap a raw identifier
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw identifier
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a college (the report scope)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollegeId(i64);

impl CollegeId {
    /// Wrap a raw identifier
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw identifier
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CollegeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Kind of event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Hands-on session
    Workshop,
    /// Talk or lecture
    Seminar,
    /// Cultural or technical festival
    Fest,
    /// Competitive build event
    Hackathon,
    /// Anything else
    Other,
}

impl EventType {
    /// Canonical name, as stored and serialized.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Workshop => "Workshop",
            Self::Seminar => "Seminar",
            Self::Fest => "Fest",
            Self::Hackathon => "Hackathon",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = LedgerError;

    /// Case-insensitive parse of the canonical names.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "workshop" => Ok(Self::Workshop),
            "seminar" => Ok(Self::Seminar),
            "fest" => Ok(Self::Fest),
            "hackathon" => Ok(Self::Hackathon),
            "other" => Ok(Self::Other),
            "" => Err(LedgerError::invalid_argument("event type is required")),
            other => Err(LedgerError::invalid_argument(format!(
                "unknown event type '{other}' (expected Workshop, Seminar, Fest, Hackathon or Other)"
            ))),
        }
    }
}

/// Maximum number of registrations an event accepts. Always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Capacity(u32);

impl Capacity {
    /// Capacity used when the caller does not specify one.
    pub const DEFAULT: Self = Self(50);

    /// Validate a caller-supplied capacity.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] unless `1 <= value <= u32::MAX`.
    pub fn try_new(value: i64) -> Result<Self> {
        match u32::try_from(value) {
            Ok(v) if v > 0 => Ok(Self(v)),
            _ => Err(LedgerError::invalid_argument(format!(
                "capacity must be a positive integer, got {value}"
            ))),
        }
    }

    /// Get the raw value
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for Capacity {
    type Error = LedgerError;

    fn try_from(value: i64) -> Result<Self> {
        Self::try_new(value)
    }
}

impl From<Capacity> for u32 {
    fn from(capacity: Capacity) -> Self {
        capacity.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Feedback rating on a 1-5 scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted rating
    pub const MIN: u8 = 1;
    /// Highest accepted rating
    pub const MAX: u8 = 5;

    /// Validate a caller-supplied rating.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] outside `1..=5`.
    pub fn try_new(value: i64) -> Result<Self> {
        match u8::try_from(value) {
            Ok(v) if (Self::MIN..=Self::MAX).contains(&v) => Ok(Self(v)),
            _ => Err(LedgerError::invalid_argument(format!(
                "rating must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            ))),
        }
    }

    /// Get the raw value
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = LedgerError;

    fn try_from(value: i64) -> Result<Self> {
        Self::try_new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

// ============================================================================
// Directory
// ============================================================================

/// A college. Events and students belong to exactly one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct College {
    /// Identifier
    pub id: CollegeId,
    /// Display name
    pub name: String,
}

/// A student known to the directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Identifier
    pub id: StudentId,
    /// Display name
    pub name: String,
    /// College the student belongs to
    pub college_id: CollegeId,
}

/// Validate and normalize a display name.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidArgument`] when the trimmed name is empty
/// or longer than `max_len` characters.
pub fn normalize_name(field: &str, value: &str, max_len: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::invalid_argument(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(LedgerError::invalid_argument(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// Events
// ============================================================================

/// Validated input for creating an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEvent {
    /// Title, trimmed and non-empty
    pub title: String,
    /// Kind of event
    pub event_type: EventType,
    /// Registration ceiling
    pub capacity: Capacity,
    /// Owning college
    pub college_id: CollegeId,
}

impl NewEvent {
    /// Longest accepted title.
    pub const MAX_TITLE_LEN: usize = 150;

    /// Validate the inputs of a new event.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] for an empty or overlong title.
    pub fn new(
        title: &str,
        event_type: EventType,
        capacity: Capacity,
        college_id: CollegeId,
    ) -> Result<Self> {
        Ok(Self {
            title: normalize_name("title", title, Self::MAX_TITLE_LEN)?,
            event_type,
            capacity,
            college_id,
        })
    }
}

/// An event and its cached counters.
///
/// `registration_count` never exceeds `capacity`, and a cancelled event never
/// changes its counters again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier
    pub id: EventId,
    /// Title
    pub title: String,
    /// Kind of event
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Registration ceiling
    pub capacity: Capacity,
    /// Owning college
    pub college_id: CollegeId,
    /// Terminal cancellation flag
    pub is_cancelled: bool,
    /// Number of registrations
    pub registration_count: u32,
    /// Number of attendance records
    pub attendance_count: u32,
    /// When the event was created
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Build a freshly created, open event with zeroed counters.
    #[must_use]
    pub fn open(id: EventId, new_event: NewEvent, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new_event.title,
            event_type: new_event.event_type,
            capacity: new_event.capacity,
            college_id: new_event.college_id,
            is_cancelled: false,
            registration_count: 0,
            attendance_count: 0,
            created_at,
        }
    }

    /// Seats still available.
    #[must_use]
    pub const fn remaining_capacity(&self) -> u32 {
        self.capacity.get().saturating_sub(self.registration_count)
    }

    /// Fail with [`LedgerError::EventCancelled`] if the event is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::EventCancelled`] for a cancelled event.
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_cancelled {
            Err(LedgerError::EventCancelled(self.id))
        } else {
            Ok(())
        }
    }

    /// Transition `Open -> Cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AlreadyCancelled`] on a repeat call.
    pub fn cancel(&mut self) -> Result<()> {
        if self.is_cancelled {
            return Err(LedgerError::AlreadyCancelled(self.id));
        }
        self.is_cancelled = true;
        Ok(())
    }

    /// Reserve one registration slot.
    ///
    /// The slot is taken immediately. The returned permit must be
    /// [committed](CapacityPermit::commit) once the registration record is
    /// persisted; dropping it uncommitted hands the slot back.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EventCancelled`] if the event is cancelled
    /// - [`LedgerError::CapacityExceeded`] if no slot is left
    pub fn reserve_capacity(&mut self) -> Result<CapacityPermit<'_>> {
        self.ensure_open()?;
        if self.registration_count >= self.capacity.get() {
            return Err(LedgerError::CapacityExceeded {
                event_id: self.id,
                capacity: self.capacity.get(),
            });
        }
        self.registration_count += 1;
        Ok(CapacityPermit {
            event: self,
            committed: false,
        })
    }

    /// Count one attendance record against the event.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::EventCancelled`] for a cancelled event.
    pub fn record_attendance(&mut self) -> Result<()> {
        if self.is_cancelled {
            return Err(LedgerError::EventCancelled(self.id));
        }
        self.attendance_count = self.attendance_count.saturating_add(1);
        Ok(())
    }
}

/// A reserved registration slot on an [`Event`].
///
/// Holding the permit keeps the event mutably borrowed, so the slot can only
/// be reserved and consumed inside the same critical section.
#[must_use = "dropping a permit without committing releases the reserved slot"]
#[derive(Debug)]
pub struct CapacityPermit<'a> {
    event: &'a mut Event,
    committed: bool,
}

impl CapacityPermit<'_> {
    /// Event the slot was reserved on.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        self.event.id
    }

    /// Registration count including this slot.
    #[must_use]
    pub fn registration_count(&self) -> u32 {
        self.event.registration_count
    }

    /// Keep the slot: the registration record has been persisted.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for CapacityPermit<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.event.registration_count = self.event.registration_count.saturating_sub(1);
        }
    }
}

// ============================================================================
// Ledger Records
// ============================================================================

/// A student's registration for an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Event
    pub event_id: EventId,
    /// Student
    pub student_id: StudentId,
    /// When the registration committed
    pub created_at: DateTime<Utc>,
}

/// A student's attendance at an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    /// Event
    pub event_id: EventId,
    /// Student
    pub student_id: StudentId,
    /// When the attendance was marked
    pub marked_at: DateTime<Utc>,
}

/// A student's feedback on an event. Immutable once stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Event
    pub event_id: EventId,
    /// Student
    pub student_id: StudentId,
    /// Rating (1-5)
    pub rating: Rating,
    /// Free-text comments
    pub comments: Option<String>,
    /// When the feedback was stored
    pub submitted_at: DateTime<Utc>,
}

/// Validated input for a feedback submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewFeedback {
    /// Event
    pub event_id: EventId,
    /// Student
    pub student_id: StudentId,
    /// Rating (1-5)
    pub rating: Rating,
    /// Trimmed comments; `None` when empty
    pub comments: Option<String>,
}

impl NewFeedback {
    /// Longest accepted comment.
    pub const MAX_COMMENT_LEN: usize = 300;

    /// Validate a submission.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] for overlong comments.
    pub fn new(
        event_id: EventId,
        student_id: StudentId,
        rating: Rating,
        comments: Option<&str>,
    ) -> Result<Self> {
        let comments = comments.map(str::trim).filter(|c| !c.is_empty());
        if let Some(text) = comments {
            if text.chars().count() > Self::MAX_COMMENT_LEN {
                return Err(LedgerError::invalid_argument(format!(
                    "comments must be at most {} characters",
                    Self::MAX_COMMENT_LEN
                )));
            }
        }
        Ok(Self {
            event_id,
            student_id,
            rating,
            comments: comments.map(str::to_string),
        })
    }

    /// Materialize the stored record.
    #[must_use]
    pub fn into_feedback(self, submitted_at: DateTime<Utc>) -> Feedback {
        Feedback {
            event_id: self.event_id,
            student_id: self.student_id,
            rating: self.rating,
            comments: self.comments,
            submitted_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn open_event(capacity: i64) -> Event {
        let new_event = NewEvent::new(
            "AI Workshop",
            EventType::Workshop,
            Capacity::try_new(capacity).unwrap(),
            CollegeId::new(1),
        )
        .unwrap();
        Event::open(EventId::new(1), new_event, Utc::now())
    }

    #[test]
    fn test_capacity_must_be_positive() {
        assert_eq!(
            Capacity::try_new(0).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            Capacity::try_new(-3).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(Capacity::try_new(1).unwrap().get(), 1);
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::try_new(0).is_err());
        assert!(Rating::try_new(6).is_err());
        assert_eq!(Rating::try_new(1).unwrap().get(), 1);
        assert_eq!(Rating::try_new(5).unwrap().get(), 5);
    }

    #[test]
    fn test_event_type_parse_is_case_insensitive() {
        assert_eq!("workshop".parse::<EventType>().unwrap(), EventType::Workshop);
        assert_eq!(" HACKATHON ".parse::<EventType>().unwrap(), EventType::Hackathon);
        assert!("party".parse::<EventType>().is_err());
        assert!("".parse::<EventType>().is_err());
    }

    #[test]
    fn test_blank_title_rejected() {
        let err = NewEvent::new(
            "   ",
            EventType::Seminar,
            Capacity::DEFAULT,
            CollegeId::new(1),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_committed_permit_keeps_slot() {
        let mut event = open_event(2);
        let permit = event.reserve_capacity().unwrap();
        assert_eq!(permit.registration_count(), 1);
        permit.commit();
        assert_eq!(event.registration_count, 1);
        assert_eq!(event.remaining_capacity(), 1);
    }

    #[test]
    fn test_dropped_permit_releases_slot() {
        let mut event = open_event(1);
        {
            let _permit = event.reserve_capacity().unwrap();
        }
        assert_eq!(event.registration_count, 0);
        event.reserve_capacity().unwrap().commit();
        assert_eq!(event.registration_count, 1);
    }

    #[test]
    fn test_reserve_beyond_capacity_fails() {
        let mut event = open_event(1);
        event.reserve_capacity().unwrap().commit();
        let err = event.reserve_capacity().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(event.registration_count, 1);
    }

    #[test]
    fn test_cancel_is_terminal() {
        let mut event = open_event(10);
        event.cancel().unwrap();
        assert_eq!(event.cancel().unwrap_err().kind(), ErrorKind::AlreadyCancelled);
        assert_eq!(
            event.reserve_capacity().unwrap_err().kind(),
            ErrorKind::EventCancelled
        );
        assert_eq!(
            event.record_attendance().unwrap_err().kind(),
            ErrorKind::EventCancelled
        );
    }

    #[test]
    fn test_feedback_comments_normalized() {
        let rating = Rating::try_new(4).unwrap();
        let fb = NewFeedback::new(EventId::new(1), StudentId::new(1), rating, Some("  ")).unwrap();
        assert_eq!(fb.comments, None);

        let long = "x".repeat(NewFeedback::MAX_COMMENT_LEN + 1);
        assert!(NewFeedback::new(EventId::new(1), StudentId::new(1), rating, Some(&long)).is_err());
    }

    #[test]
    fn test_event_serializes_type_field() {
        let event = open_event(5);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Workshop");
        assert_eq!(json["capacity"], 5);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn registration_count_never_exceeds_capacity(
                capacity in 1i64..20,
                attempts in proptest::collection::vec(any::<bool>(), 0..60),
            ) {
                let mut event = open_event(capacity);
                for commit in attempts {
                    if let Ok(permit) = event.reserve_capacity() {
                        if commit {
                            permit.commit();
                        }
                    }
                    prop_assert!(event.registration_count <= event.capacity.get());
                }
            }
        }
    }
}
