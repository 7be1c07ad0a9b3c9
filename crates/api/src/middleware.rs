//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use polis_core::{PollService, ResponseLedger, VisibilityGate};

use crate::extractors::Actor;

/// Header carrying the authenticated caller id.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Header flagging the caller as an expert (`true` or `1`).
pub const ACTOR_EXPERT_HEADER: &str = "x-actor-expert";

/// Longest accepted caller id, in characters. Matches the id columns.
pub const MAX_ACTOR_ID_LENGTH: usize = 64;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub poll_service: PollService,
    pub ledger: ResponseLedger,
    pub visibility_gate: VisibilityGate,
}

/// Identity middleware.
///
/// Callers are authenticated upstream. The resolved identity arrives in
/// headers and is stored as an [`Actor`] in the request extensions. Empty
/// or overlong ids leave the request unauthenticated.
pub async fn actor_middleware(mut req: Request<Body>, next: Next) -> Response {
    let actor_id = req
        .headers()
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.chars().count() <= MAX_ACTOR_ID_LENGTH)
        .map(str::to_string);

    if let Some(id) = actor_id {
        let is_expert = req
            .headers()
            .get(ACTOR_EXPERT_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|flag| matches!(flag.trim(), "true" | "1"));

        req.extensions_mut().insert(Actor { id, is_expert });
    }

    next.run(req).await
}
