//! HTTP interface for the campus event ledger.
//!
//! Thin axum shell over [`EventLedger`](campus_ledger_runtime::EventLedger):
//! handlers extract the bearer-token principal and the request payload, call
//! one ledger operation and render the result in a JSON envelope.
//!
//! # Request Flow
//!
//! 1. **Correlation layer** assigns the request ID and opens the `http_request` span
//! 2. **[`Authenticated`]** resolves `Authorization: Bearer <uuid>` to a principal
//! 3. **Handler** calls the ledger
//! 4. **[`AppError`]** maps ledger error kinds to status codes
//!
//! # Example
//!
//! ```ignore
//! use campus_ledger_web::{AppState, SessionDirectory, build_router};
//!
//! let sessions = Arc::new(SessionDirectory::with_admin_token(admin_token));
//! let app = build_router(AppState::new(ledger, sessions));
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod sessions;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{Authenticated, BearerToken, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use response::ApiResponse;
pub use routes::build_router;
pub use sessions::SessionDirectory;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
