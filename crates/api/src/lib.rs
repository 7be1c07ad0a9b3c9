//! HTTP API layer for polis.
//!
//! - **Endpoints**: JSON `POST` endpoints for polls and responses
//! - **Extractors**: caller identity set by [`middleware::actor_middleware`]
//! - **Middleware**: application state and identity propagation
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, actor_middleware};
