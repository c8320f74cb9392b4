//! Core module containing the domain types and traits of the events API

pub mod auth;
pub mod error;
pub mod event;
pub mod extractors;
pub mod query;
pub mod repository;

pub use auth::{AuthError, AuthProvider, StaticTokenAuthProvider, User};
pub use error::{ApiError, EventError, RequestError, ValidationError};
pub use event::{Event, EventCreate, EventResponse, EventUpdate, EventsResponse, WrapperResponse};
pub use extractors::{CurrentUser, EventId, Validated};
pub use query::EventsFilter;
pub use repository::EventRepository;
