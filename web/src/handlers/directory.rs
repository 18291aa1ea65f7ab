//! Colleges and students.

use super::ScopeQuery;
use crate::error::AppError;
use crate::extractors::{ApiJson, ApiQuery, Authenticated};
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use campus_ledger_core::{College, CollegeId, Student};
use serde::Deserialize;

/// Request to create a college.
#[derive(Debug, Deserialize)]
pub struct CreateCollegeRequest {
    /// College name
    #[serde(default)]
    pub name: String,
}

/// Request to create a student.
#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    /// Student name
    #[serde(default)]
    pub name: String,
    /// Owning college
    pub college_id: CollegeId,
}

/// POST /api/colleges
///
/// # Errors
///
/// 403 for non-admins, 400 for a blank name.
pub async fn create_college(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiJson(request): ApiJson<CreateCollegeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<College>>), AppError> {
    let college = state.ledger.create_college(&principal, &request.name).await?;
    Ok(ApiResponse::created(college, "College created"))
}

/// GET /api/colleges
///
/// # Errors
///
/// 503 if the store is unavailable.
pub async fn list_colleges(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
) -> Result<Json<ApiResponse<Vec<College>>>, AppError> {
    Ok(ApiResponse::ok(state.ledger.list_colleges().await?))
}

/// POST /api/students
///
/// # Errors
///
/// 403 for non-admins, 400 for a blank name, 404 for an unknown college.
pub async fn create_student(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiJson(request): ApiJson<CreateStudentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Student>>), AppError> {
    let student = state
        .ledger
        .create_student(&principal, &request.name, request.college_id)
        .await?;
    Ok(ApiResponse::created(student, "Student created"))
}

/// GET /api/students?college_id=
///
/// # Errors
///
/// 403 for non-admins.
pub async fn list_students(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiQuery(query): ApiQuery<ScopeQuery>,
) -> Result<Json<ApiResponse<Vec<Student>>>, AppError> {
    let students = state.ledger.list_students(&principal, query.scope()).await?;
    Ok(ApiResponse::ok(students))
}
