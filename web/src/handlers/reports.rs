//! Reporting endpoints. Any authenticated principal may read them.

use super::ScopeQuery;
use crate::error::AppError;
use crate::extractors::{ApiQuery, Authenticated};
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{Json, extract::State};
use campus_ledger_core::reports::{
    ActiveStudentRow, FeedbackSummaryRow, InactiveStudentRow, PopularityRow,
};

type Report<T> = Result<Json<ApiResponse<Vec<T>>>, AppError>;

/// GET /api/reports/event-popularity?college_id=
///
/// # Errors
///
/// 503 if the store is unavailable.
pub async fn event_popularity(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    ApiQuery(query): ApiQuery<ScopeQuery>,
) -> Report<PopularityRow> {
    Ok(ApiResponse::ok(state.ledger.event_popularity(query.scope()).await?))
}

/// GET /api/reports/top-active-students?college_id=&limit=
///
/// # Errors
///
/// 400 for a non-positive limit.
pub async fn top_active_students(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    ApiQuery(query): ApiQuery<ScopeQuery>,
) -> Report<ActiveStudentRow> {
    Ok(ApiResponse::ok(
        state
            .ledger
            .top_active_students(query.scope(), query.limit)
            .await?,
    ))
}

/// GET /api/reports/average-feedback?college_id=
///
/// # Errors
///
/// 503 if the store is unavailable.
pub async fn average_feedback(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    ApiQuery(query): ApiQuery<ScopeQuery>,
) -> Report<FeedbackSummaryRow> {
    Ok(ApiResponse::ok(state.ledger.average_feedback(query.scope()).await?))
}

/// GET /api/reports/top-events-feedback?college_id=&limit=
///
/// # Errors
///
/// 400 for a non-positive limit.
pub async fn top_events_by_feedback(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    ApiQuery(query): ApiQuery<ScopeQuery>,
) -> Report<FeedbackSummaryRow> {
    Ok(ApiResponse::ok(
        state
            .ledger
            .top_events_by_feedback(query.scope(), query.limit)
            .await?,
    ))
}

/// GET /api/reports/inactive-students?college_id=
///
/// # Errors
///
/// 503 if the store is unavailable.
pub async fn inactive_students(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    ApiQuery(query): ApiQuery<ScopeQuery>,
) -> Report<InactiveStudentRow> {
    Ok(ApiResponse::ok(state.ledger.inactive_students(query.scope()).await?))
}
