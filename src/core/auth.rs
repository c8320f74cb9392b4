//! Caller authentication
//!
//! Every protected route resolves a [`User`] from the request headers before
//! doing any work. The WebSocket endpoint does the same before the upgrade, so
//! an anonymous client never reaches the connection registry.
//!
//! Accepted header forms:
//! - `Authorization: Token <token>`
//! - `Authorization: Bearer <token>`

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// Why a request could not be authenticated
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingCredentials,

    #[error("malformed authorization header")]
    MalformedCredentials,

    #[error("invalid token")]
    InvalidToken,
}

/// Trait for auth providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the caller from request headers
    async fn authenticate(&self, headers: &HeaderMap) -> Result<User, AuthError>;
}

/// Extract the raw token from an `Authorization` header
pub fn token_from_headers(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredentials)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::MalformedCredentials)?;

    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedCredentials);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedCredentials);
    }

    Ok(token)
}

/// Auth provider backed by a fixed token table (loaded from config)
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthProvider {
    tokens: HashMap<String, User>,
}

impl StaticTokenAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a user
    pub fn with_token(mut self, token: impl Into<String>, user: User) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuthProvider {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<User, AuthError> {
        let token = token_from_headers(headers)?;
        self.tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}
