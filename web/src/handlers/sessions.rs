//! Session issuance and revocation.
//!
//! - POST /auth/sessions - Admin issues a token for a role
//! - DELETE /auth/sessions - Revoke the caller's own token

use crate::error::AppError;
use crate::extractors::{ApiJson, Authenticated, BearerToken, CorrelationId};
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use campus_ledger_core::{Principal, Role, StudentId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to issue a session.
#[derive(Debug, Deserialize)]
pub struct IssueSessionRequest {
    /// Role of the new session
    pub role: Role,
    /// Required for students, rejected for admins
    pub student_id: Option<StudentId>,
}

/// Issued session.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Bearer token
    pub token: Uuid,
    /// Role bound to the token
    pub role: Role,
    /// Student bound to the token
    pub student_id: Option<StudentId>,
}

/// Revocation result.
#[derive(Debug, Serialize)]
pub struct RevokedResponse {
    /// Always `true`
    pub revoked: bool,
}

/// Issue a session. Admin only; a student session needs an existing student.
///
/// # Errors
///
/// - 403 for a non-admin caller
/// - 400 when the role and student id do not match
/// - 404 for an unknown student
pub async fn issue_session(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    correlation_id: CorrelationId,
    ApiJson(request): ApiJson<IssueSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), AppError> {
    caller.require_admin()?;
    let principal = Principal::from_descriptor(request.role, request.student_id)?;
    if let Some(student_id) = principal.student_id() {
        state.ledger.get_student(student_id).await?;
    }

    let token = state.sessions.issue(principal).await;
    tracing::info!(
        correlation_id = %correlation_id.0,
        role = %principal.role(),
        "Issued session"
    );

    Ok(ApiResponse::created(
        SessionResponse {
            token,
            role: principal.role(),
            student_id: principal.student_id(),
        },
        "Session issued",
    ))
}

/// Revoke the session whose token authenticates this request.
///
/// # Errors
///
/// 401 when the token is missing or not a live session.
pub async fn revoke_session(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<ApiResponse<RevokedResponse>>, AppError> {
    if state.sessions.revoke(&token).await {
        Ok(ApiResponse::ok(RevokedResponse { revoked: true }))
    } else {
        Err(AppError::unauthorized("Unknown or revoked session"))
    }
}
