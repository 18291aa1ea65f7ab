//! Router configuration.

use crate::handlers::{directory, events, health, ledger, reports, sessions};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - `/health`, `/ready`: unauthenticated probes
/// - `/auth/sessions`: session issuance and revocation
/// - `/api/...`: the ledger, authenticated by bearer token
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Directory
        .route(
            "/colleges",
            post(directory::create_college).get(directory::list_colleges),
        )
        .route(
            "/students",
            post(directory::create_student).get(directory::list_students),
        )
        // Event registry
        .route("/events", post(events::create_event).get(events::list_events))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id/cancel", post(events::cancel_event))
        .route("/events/:id/register", post(events::register))
        .route("/events/:id/registrations", get(events::list_registrations))
        // Attendance and feedback
        .route("/attendance", post(ledger::mark_attendance))
        .route("/feedback", post(ledger::submit_feedback))
        // Reports
        .route("/reports/event-popularity", get(reports::event_popularity))
        .route(
            "/reports/top-active-students",
            get(reports::top_active_students),
        )
        .route("/reports/average-feedback", get(reports::average_feedback))
        .route(
            "/reports/top-events-feedback",
            get(reports::top_events_by_feedback),
        )
        .route("/reports/inactive-students", get(reports::inactive_students));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route(
            "/auth/sessions",
            post(sessions::issue_session).delete(sessions::revoke_session),
        )
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(correlation_id_layer())
        .with_state(state)
}
