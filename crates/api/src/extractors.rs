//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use polis_common::AppError;
use polis_core::Respondent;

/// Caller identity placed in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Opaque user id.
    pub id: String,
    /// Whether the caller may answer expert-only polls.
    pub is_expert: bool,
}

impl Actor {
    /// The caller as a poll respondent.
    #[must_use]
    pub fn respondent(&self) -> Respondent {
        Respondent {
            id: self.id.clone(),
            is_expert: self.is_expert,
        }
    }
}

/// Authenticated caller extractor.
#[derive(Debug, Clone)]
pub struct AuthActor(pub Actor);

impl<S> FromRequestParts<S> for AuthActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(AuthActor)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional caller extractor.
#[derive(Debug, Clone)]
pub struct MaybeActor(pub Option<Actor>);

impl<S> FromRequestParts<S> for MaybeActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Actor>().cloned()))
    }
}
