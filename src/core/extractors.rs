//! Axum extractors for the events API
//!
//! This module provides HTTP extractors that automatically:
//! - Resolve the authenticated caller ([`CurrentUser`])
//! - Deserialize and validate request bodies ([`Validated`])
//! - Parse event ids from the path ([`EventId`])
//!
//! All of them reject with [`ApiError`], so failures share the JSON error
//! format of the handlers.

use crate::core::auth::{AuthError, AuthProvider, User};
use crate::core::error::{ApiError, RequestError, ValidationError};
use axum::Json;
use axum::extract::{FromRef, FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use validator::Validate;

/// The authenticated caller of a request
///
/// # Usage
///
/// ```rust,ignore
/// pub async fn get_event(CurrentUser(user): CurrentUser) -> ... {
///     tracing::info!(user_id = user.id, "fetching event");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Request(RequestError::Unauthorized {
            message: err.to_string(),
        })
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<dyn AuthProvider>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let provider = <Arc<dyn AuthProvider> as FromRef<S>>::from_ref(state);
        let user = provider.authenticate(&parts.headers).await?;
        Ok(CurrentUser(user))
    }
}

/// JSON body that has passed its `validator` constraints
///
/// # Usage
///
/// ```rust,ignore
/// pub async fn create_event(
///     Validated(payload): Validated<EventCreate>,
/// ) -> Result<Json<Event>, ApiError> {
///     // payload is already validated
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Validated<T>(pub T);

impl<S, T> FromRequest<S> for Validated<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state).await.map_err(|e| {
            ApiError::Validation(ValidationError::InvalidJson {
                message: e.body_text(),
            })
        })?;

        payload.validate().map_err(ValidationError::from)?;

        Ok(Validated(payload))
    }
}

/// Event id taken from the `{id}` path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventId(pub i64);

impl<S> FromRequestParts<S> for EventId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                ApiError::Validation(ValidationError::InvalidId {
                    value: e.body_text(),
                })
            })?;

        raw.parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .map(EventId)
            .ok_or(ApiError::Validation(ValidationError::InvalidId { value: raw }))
    }
}
