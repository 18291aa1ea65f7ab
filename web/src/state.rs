//! Application state for Axum handlers.

use crate::sessions::SessionDirectory;
use campus_ledger_runtime::EventLedger;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; both fields are cheap `Arc` handles.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The ledger service
    pub ledger: EventLedger,
    /// Bearer-token sessions
    pub sessions: Arc<SessionDirectory>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(ledger: EventLedger, sessions: Arc<SessionDirectory>) -> Self {
        Self { ledger, sessions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        // Ensure AppState implements Clone (required for Axum)
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }
}
