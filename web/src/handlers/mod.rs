//! HTTP request handlers.
//!
//! One module per area of the API; every handler returns the
//! [`ApiResponse`](crate::response::ApiResponse) envelope or an
//! [`AppError`](crate::AppError).

pub mod directory;
pub mod events;
pub mod health;
pub mod ledger;
pub mod reports;
pub mod sessions;

use campus_ledger_core::CollegeId;
use campus_ledger_core::store::Scope;
use serde::Deserialize;

/// `?college_id=` filter shared by listings and reports.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    /// Restrict to one college
    pub college_id: Option<CollegeId>,
    /// Maximum number of rows, where the endpoint supports it
    pub limit: Option<i64>,
}

impl ScopeQuery {
    /// The college scope.
    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::from(self.college_id)
    }
}
