//! Attendance and feedback endpoints.

use crate::error::AppError;
use crate::extractors::{ApiJson, Authenticated};
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use campus_ledger_core::{Attendance, EventId, Feedback, StudentId};
use serde::Deserialize;

/// Request to mark attendance.
#[derive(Debug, Deserialize)]
pub struct AttendanceRequest {
    /// Event attended
    pub event_id: EventId,
    /// Student; admins must name one
    pub student_id: Option<StudentId>,
}

/// Request to submit feedback.
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    /// Event rated
    pub event_id: EventId,
    /// Must be the caller when present
    pub student_id: Option<StudentId>,
    /// Rating, 1 to 5
    pub rating: i64,
    /// Optional comments
    pub comments: Option<String>,
}

/// POST /api/attendance
///
/// # Errors
///
/// 409 for duplicates, a cancelled event or a missing registration under
/// the strict policy; 404 for unknown ids.
pub async fn mark_attendance(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiJson(request): ApiJson<AttendanceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Attendance>>), AppError> {
    let attendance = state
        .ledger
        .mark_attendance(&principal, request.event_id, request.student_id)
        .await?;
    Ok(ApiResponse::created(attendance, "Attendance marked"))
}

/// POST /api/feedback
///
/// # Errors
///
/// 403 for admins, 400 for a rating outside 1-5, 409 for resubmission or
/// missing attendance.
pub async fn submit_feedback(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiJson(request): ApiJson<FeedbackRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Feedback>>), AppError> {
    let feedback = state
        .ledger
        .submit_feedback(
            &principal,
            request.event_id,
            request.student_id,
            request.rating,
            request.comments.as_deref(),
        )
        .await?;
    Ok(ApiResponse::created(feedback, "Feedback submitted"))
}
