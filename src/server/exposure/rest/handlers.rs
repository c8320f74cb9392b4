//! Event HTTP handlers

use crate::core::error::{ApiError, EventError, RequestError, ValidationError};
use crate::core::event::{EventCreate, EventResponse, EventUpdate, EventsResponse, WrapperResponse};
use crate::core::extractors::{CurrentUser, EventId, Validated};
use crate::core::query::EventsFilter;
use crate::server::exposure::websocket;
use crate::server::state::AppState;
use axum::extract::{FromRequestParts, Query, Request, State, WebSocketUpgrade};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};

type EventJson = Json<WrapperResponse<EventResponse>>;

/// `GET /events`: list events, or open the chat channel on a WebSocket upgrade
pub async fn events_root(State(state): State<AppState>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();

    if websocket::is_websocket_upgrade(&parts.headers) {
        return websocket_events(state, parts)
            .await
            .unwrap_or_else(|e| e.into_response());
    }

    list_events(state, parts).await.into_response()
}

async fn websocket_events(state: AppState, mut parts: Parts) -> Result<Response, ApiError> {
    let user = state.auth.authenticate(&parts.headers).await?;

    let ws = match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    Ok(websocket::accept(ws, state, user))
}

async fn list_events(
    state: AppState,
    mut parts: Parts,
) -> Result<Json<WrapperResponse<EventsResponse>>, ApiError> {
    let Query(filter) = Query::<EventsFilter>::from_request_parts(&mut parts, &state)
        .await
        .map_err(|e| ValidationError::InvalidQuery {
            message: e.body_text(),
        })?;

    let events = state
        .repository
        .get_events(filter.limit(), filter.offset())
        .await?;

    Ok(Json(WrapperResponse::new(EventsResponse { events })))
}

/// `POST /events`
pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Validated(request): Validated<EventCreate>,
) -> Result<EventJson, ApiError> {
    if state
        .repository
        .get_event_by_title(&request.title)
        .await?
        .is_some()
    {
        return Err(EventError::AlreadyExists {
            title: request.title,
        }
        .into());
    }

    let event = state
        .repository
        .create_event_by_user_id(user.id, request)
        .await
        .map_err(|e| EventError::CreateFailed {
            message: format!("{:#}", e),
        })?;

    tracing::info!(event_id = event.id, user_id = user.id, "Event created");

    Ok(Json(WrapperResponse::new(EventResponse { event })))
}

/// `GET /events/{id}`
pub async fn get_event(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    EventId(id): EventId,
) -> Result<EventJson, ApiError> {
    let event = state
        .repository
        .get_event_by_id(id)
        .await?
        .ok_or(EventError::NotFound { id })?;

    Ok(Json(WrapperResponse::new(EventResponse { event })))
}

/// `PATCH /events/{id}`
pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    EventId(id): EventId,
    Validated(request): Validated<EventUpdate>,
) -> Result<EventJson, ApiError> {
    if let Some(title) = request.title.as_deref() {
        let taken = state.repository.get_event_by_title(title).await?;
        if taken.is_some_and(|existing| existing.id != id) {
            return Err(EventError::AlreadyExists {
                title: title.to_string(),
            }
            .into());
        }
    }

    let current = state
        .repository
        .get_event_by_id(id)
        .await?
        .ok_or(EventError::NotFound { id })?;
    ensure_owner(current.owner_id, user.id)?;

    let event = state
        .repository
        .update_event_by_id(user.id, id, request)
        .await
        .map_err(|e| {
            tracing::warn!(event_id = id, error = %e, "Event update refused");
            EventError::UpdateFailed { id }
        })?
        .ok_or(EventError::UpdateFailed { id })?;

    tracing::info!(event_id = id, user_id = user.id, "Event updated");

    Ok(Json(WrapperResponse::new(EventResponse { event })))
}

/// `DELETE /events/{id}`
pub async fn delete_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    EventId(id): EventId,
) -> Result<Json<WrapperResponse<()>>, ApiError> {
    let current = state
        .repository
        .get_event_by_id(id)
        .await?
        .ok_or(EventError::DeleteMissing { id })?;
    ensure_owner(current.owner_id, user.id)?;

    // a concurrent delete may have won the race
    if !state.repository.delete_event_by_id(user.id, id).await? {
        return Err(EventError::DeleteMissing { id }.into());
    }

    tracing::info!(event_id = id, user_id = user.id, "Event deleted");

    Ok(Json(WrapperResponse::empty()))
}

fn ensure_owner(owner_id: i64, user_id: i64) -> Result<(), ApiError> {
    if owner_id != user_id {
        return Err(RequestError::Forbidden {
            message: "only the owner can modify this event".to_string(),
        }
        .into());
    }
    Ok(())
}
