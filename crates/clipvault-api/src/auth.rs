//! Caller identity extraction.
//!
//! The service sits behind a gateway that authenticates requests and injects
//! the authenticated user id as the `X-Owner-Id` header. Handlers take an
//! [`OwnerId`] argument to require it; a request without the header is
//! rejected before the handler runs.

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;

use crate::error::ErrorResponse;

pub const OWNER_ID_HEADER: &str = "X-Owner-Id";

/// Identity of the caller, as asserted by the upstream gateway.
#[derive(Debug, Clone)]
pub struct OwnerId(pub String);

// Implemented as FromRequestParts so it composes with Multipart, which
// consumes the request body.
impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| OwnerId(value.to_string()))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse::full(
                        "Missing owner identity",
                        "MISSING_OWNER_ID",
                        false,
                        Some("Send the X-Owner-Id header set by the auth gateway"),
                    )),
                )
            })
    }
}
