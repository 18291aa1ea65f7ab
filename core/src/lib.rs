//! # Campus Ledger Core
//!
//! Domain types and rules for the campus event registration and engagement
//! ledger.
//!
//! ## Core Concepts
//!
//! - **Event**: a capacity-limited, cancellable occasion owned by a college
//! - **Registration / Attendance / Feedback**: at most one record per
//!   (event, student) pair, never mutated once stored
//! - **Principal**: the authenticated caller, checked by the identity gate
//! - **`LedgerStore`**: persistence seam with per-event atomic writes
//! - **Reports**: pure aggregations over a committed [`store::LedgerSnapshot`]
//!
//! ## Architecture Principles
//!
//! - Business rule violations are values ([`LedgerError`]), never panics
//! - Invariants live on the types: [`Capacity`] and [`Rating`] validate on
//!   construction, [`CapacityPermit`] hands a seat back when dropped
//! - Time and storage are injected so every rule is testable without I/O
//!
//! ## Example
//!
//! ```
//! use campus_ledger_core::{Capacity, CollegeId, Event, EventId, EventType, NewEvent};
//! use chrono::Utc;
//!
//! let new_event = NewEvent::new("Rust Workshop", EventType::Workshop, Capacity::try_new(1)?, CollegeId::new(1))?;
//! let mut event = Event::open(EventId::new(1), new_event, Utc::now());
//!
//! event.reserve_capacity()?.commit();
//! assert!(event.reserve_capacity().is_err());
//! # Ok::<(), campus_ledger_core::LedgerError>(())
//! ```

pub mod error;
pub mod identity;
pub mod reports;
pub mod store;
pub mod types;

pub use error::{ErrorKind, LedgerError, Result};
pub use identity::{Principal, Role};
pub use store::{EventRecords, LedgerPolicy, LedgerSnapshot, LedgerStore, Scope, StoreFuture};
pub use types::{
    Attendance, Capacity, CapacityPermit, College, CollegeId, Event, EventId, EventType, Feedback,
    NewEvent, NewFeedback, Rating, Registration, Student, StudentId,
};

/// Environment module - injected dependencies
///
/// Ledger operations read the current time through [`Clock`](environment::Clock)
/// so tests can pin timestamps.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock used in production.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
