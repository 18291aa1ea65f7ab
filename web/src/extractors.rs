//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation ID
//! - [`BearerToken`]: the session token from `Authorization: Bearer <uuid>`
//! - [`Authenticated`]: the [`Principal`] behind that token
//! - [`ApiJson`], [`ApiQuery`], [`ApiPath`]: the axum extractors with
//!   rejections rendered as the `invalid_argument` envelope
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     State(state): State<AppState>,
//!     Authenticated(principal): Authenticated,
//!     ApiPath(event_id): ApiPath<i64>,
//! ) -> Result<Json<ApiResponse<Event>>, AppError> {
//!     let event = state.ledger.cancel_event(&principal, EventId::new(event_id)).await?;
//!     Ok(ApiResponse::ok(event))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use campus_ledger_core::Principal;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Taken from the request extensions when the correlation middleware ran,
/// otherwise from the `X-Correlation-ID` header, otherwise freshly generated.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Session token extracted from `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy)]
pub struct BearerToken(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
            })?
            .trim();

        Uuid::parse_str(token)
            .map(Self)
            .map_err(|_| AppError::unauthorized("Invalid session token format"))
    }
}

/// The authenticated principal of the request.
///
/// Rejects with 401 when the token is missing, malformed or unknown.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let principal = state
            .sessions
            .resolve(&token)
            .await
            .ok_or_else(|| AppError::unauthorized("Unknown or revoked session"))?;

        tracing::debug!(role = %principal.role(), "Request authenticated");
        Ok(Self(principal))
    }
}

/// JSON body extractor with envelope rejections.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor with envelope rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameter extractor with envelope rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
