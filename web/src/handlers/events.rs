//! Event registry endpoints.
//!
//! - POST /api/events - Create an event (admin)
//! - GET /api/events - List events, cancelled ones included
//! - GET /api/events/:id - Event details with live counters
//! - POST /api/events/:id/cancel - Cancel an event (admin)
//! - POST /api/events/:id/register - Register a student
//! - GET /api/events/:id/registrations - Registrations of an event (admin)

use super::ScopeQuery;
use crate::error::AppError;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, Authenticated};
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use campus_ledger_core::{
    Capacity, CollegeId, Event, EventId, EventType, Registration, StudentId,
};
use campus_ledger_runtime::EventDraft;
use serde::Deserialize;

/// Request to create an event.
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    /// Event title
    #[serde(default)]
    pub title: String,
    /// Event type, case-insensitive
    #[serde(rename = "type", default)]
    pub event_type: String,
    /// Capacity, 50 when omitted
    pub capacity: Option<i64>,
    /// Owning college, the first college when omitted
    pub college_id: Option<CollegeId>,
}

/// Request body of a registration; admins name the student.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    /// Student to register
    pub student_id: Option<StudentId>,
}

/// POST /api/events
///
/// # Errors
///
/// 403 for non-admins, 400 for invalid input, 404 for an unknown college.
pub async fn create_event(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiJson(request): ApiJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Event>>), AppError> {
    let draft = EventDraft {
        title: request.title,
        event_type: request.event_type.parse::<EventType>()?,
        capacity: request.capacity.map(Capacity::try_new).transpose()?,
        college_id: request.college_id,
    };
    let event = state.ledger.create_event(&principal, draft).await?;
    Ok(ApiResponse::created(event, "Event created"))
}

/// GET /api/events?college_id=
///
/// # Errors
///
/// 503 if the store is unavailable.
pub async fn list_events(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    ApiQuery(query): ApiQuery<ScopeQuery>,
) -> Result<Json<ApiResponse<Vec<Event>>>, AppError> {
    Ok(ApiResponse::ok(state.ledger.list_events(query.scope()).await?))
}

/// GET /api/events/:id
///
/// # Errors
///
/// 404 for an unknown event.
pub async fn get_event(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<Json<ApiResponse<Event>>, AppError> {
    Ok(ApiResponse::ok(state.ledger.get_event(event_id).await?))
}

/// POST /api/events/:id/cancel
///
/// # Errors
///
/// 403 for non-admins, 404 for an unknown event, 409 when already cancelled.
pub async fn cancel_event(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<Json<ApiResponse<Event>>, AppError> {
    Ok(ApiResponse::ok(
        state.ledger.cancel_event(&principal, event_id).await?,
    ))
}

/// POST /api/events/:id/register
///
/// The body is optional for students registering themselves.
///
/// # Errors
///
/// 409 for duplicates, a full or cancelled event; 404 for unknown ids.
pub async fn register(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(event_id): ApiPath<EventId>,
    request: Option<ApiJson<RegisterRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<Registration>>), AppError> {
    let request = request.map(|ApiJson(r)| r).unwrap_or_default();
    let registration = state
        .ledger
        .register(&principal, event_id, request.student_id)
        .await?;
    Ok(ApiResponse::created(registration, "Registered"))
}

/// GET /api/events/:id/registrations
///
/// # Errors
///
/// 403 for non-admins, 404 for an unknown event.
pub async fn list_registrations(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<Json<ApiResponse<Vec<Registration>>>, AppError> {
    Ok(ApiResponse::ok(
        state.ledger.list_registrations(&principal, event_id).await?,
    ))
}
