//! The ledger service.
//!
//! [`EventLedger`] is the single entry point for every ledger operation. It
//! applies the identity gate, validates inputs, stamps times from the
//! injected clock and delegates atomic writes to the [`LedgerStore`].
//!
//! Operations are grouped by concern:
//!
//! - [`registry`]: event creation, lookup and cancellation
//! - [`registration`]: registrations and attendance
//! - [`feedback`]: feedback submission
//! - [`reports`]: read-only aggregates
//! - [`directory`]: colleges and students

use crate::retry::{RetryPolicy, retry_transient};
use campus_ledger_core::environment::Clock;
use campus_ledger_core::store::StoreFuture;
use campus_ledger_core::{LedgerError, LedgerPolicy, LedgerStore, Result, Student, StudentId};
use std::sync::Arc;

pub mod directory;
pub mod feedback;
pub mod registration;
pub mod registry;
pub mod reports;

pub use registry::EventDraft;

/// Event registration and engagement ledger.
///
/// Cheap to clone; clones share the store and clock.
#[derive(Clone)]
pub struct EventLedger {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    policy: LedgerPolicy,
    retry: RetryPolicy,
}

impl EventLedger {
    /// Create a ledger with the default policy and retry settings.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            policy: LedgerPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the record-ordering policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: LedgerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the retry policy used for reads.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Active record-ordering policy.
    #[must_use]
    pub const fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Check that the store answers.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` when the store stays unreachable after
    /// retries.
    pub async fn ping(&self) -> Result<()> {
        self.read("ping", || self.store.ping()).await
    }

    /// Run a store read under the retry policy.
    async fn read<'a, T, F>(&'a self, operation: &'static str, call: F) -> Result<T>
    where
        F: FnMut() -> StoreFuture<'a, T>,
    {
        retry_transient(&self.retry, operation, call).await
    }

    /// Look up a student that an operation acts on.
    async fn existing_student(&self, student_id: StudentId) -> Result<Student> {
        self.read("get_student", || self.store.get_student(student_id))
            .await?
            .ok_or_else(|| LedgerError::not_found("student", student_id))
    }
}

impl std::fmt::Debug for EventLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLedger")
            .field("policy", &self.policy)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
