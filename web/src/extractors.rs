//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the id assigned by the correlation middleware, or one
//!   read from the `X-Correlation-ID` header, or a fresh UUID
//! - [`ActingUser`]: the staff identity performing the request
//!
//! Authentication and role checks happen in front of this service. By the
//! time a request arrives here the identity layer has put the authenticated
//! user's id into the `X-User-Id` header; handlers only read it.

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;

/// Header carrying the identity of the staff member making the request.
pub const ACTING_USER_HEADER: &str = "X-User-Id";

/// Correlation ID for request tracing.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<CorrelationId>() {
            return Ok(*id);
        }

        let correlation_id = header_uuid(&parts.headers, CORRELATION_ID_HEADER)
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Identity of the staff member performing the request.
///
/// Rejects with 401 when the header is missing or not a UUID.
///
/// # Example
///
/// ```ignore
/// async fn check_out(
///     ActingUser(custodian): ActingUser,
///     Path(id): Path<i64>,
/// ) -> WebResult<Json<BagResponse>> {
///     // custodian becomes custodian-out
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if parts.headers.get(ACTING_USER_HEADER).is_none() {
            return Err(AppError::unauthorized(format!(
                "Missing {ACTING_USER_HEADER} header"
            )));
        }

        header_uuid(&parts.headers, ACTING_USER_HEADER)
            .map(Self)
            .ok_or_else(|| {
                AppError::unauthorized(format!("{ACTING_USER_HEADER} header is not a valid id"))
            })
    }
}

fn header_uuid(headers: &HeaderMap, name: &str) -> Option<Uuid> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).expect("Valid request").into_parts().0
    }

    #[tokio::test]
    async fn correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let mut parts = parts(Request::builder().header(CORRELATION_ID_HEADER, uuid.to_string()));

        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn correlation_id_prefers_extension() {
        let assigned = Uuid::new_v4();
        let mut parts = parts(Request::builder().header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string()));
        parts.extensions.insert(CorrelationId(assigned));

        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, assigned);
    }

    #[tokio::test]
    async fn acting_user_from_header() {
        let user = Uuid::new_v4();
        let mut parts = parts(Request::builder().header(ACTING_USER_HEADER, user.to_string()));

        let acting = ActingUser::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(acting, ActingUser(user));
    }

    #[tokio::test]
    async fn acting_user_missing_is_unauthorized() {
        let mut parts = parts(Request::builder());

        let err = ActingUser::from_request_parts(&mut parts, &())
            .await
            .expect_err("Should reject");

        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "Missing X-User-Id header");
    }

    #[tokio::test]
    async fn acting_user_garbage_is_unauthorized() {
        let mut parts = parts(Request::builder().header(ACTING_USER_HEADER, "volunteer-7"));

        let err = ActingUser::from_request_parts(&mut parts, &())
            .await
            .expect_err("Should reject");

        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
