//! # Campus Ledger Testing
//!
//! Testing utilities for the campus event ledger.
//!
//! This crate provides:
//! - Deterministic clocks
//! - A fault-injecting store wrapper ([`UnavailableStore`])
//! - Seeding fixtures for colleges and students
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```ignore
//! use campus_ledger_testing::{test_clock, UnavailableStore};
//! use campus_ledger_runtime::{EventLedger, InMemoryLedgerStore};
//!
//! #[tokio::test]
//! async fn reads_survive_a_blip() {
//!     let store = Arc::new(UnavailableStore::new(Arc::new(InMemoryLedgerStore::new())));
//!     store.fail_next(1);
//!     let ledger = EventLedger::new(store, Arc::new(test_clock()));
//!     assert!(ledger.list_colleges().await.is_ok());
//! }
//! ```

use chrono::{DateTime, Utc};
use campus_ledger_core::environment::Clock;

mod faults;
pub mod fixtures;

pub use faults::UnavailableStore;
pub use fixtures::{CampusFixture, seed_campus};

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use campus_ledger_testing::mocks::FixedClock;
    /// use campus_ledger_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing strategies for domain values.
pub mod properties {
    use campus_ledger_core::Rating;
    use proptest::prelude::*;

    /// Ratings accepted by [`Rating::try_new`].
    pub fn valid_rating() -> impl Strategy<Value = i64> {
        i64::from(Rating::MIN)..=i64::from(Rating::MAX)
    }

    /// Integers rejected by [`Rating::try_new`].
    pub fn invalid_rating() -> impl Strategy<Value = i64> {
        prop_oneof![i64::MIN..i64::from(Rating::MIN), (i64::from(Rating::MAX) + 1)..i64::MAX]
    }

    /// Small positive capacities, suited to contention tests.
    pub fn small_capacity() -> impl Strategy<Value = i64> {
        1i64..=16
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,campus_ledger=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
