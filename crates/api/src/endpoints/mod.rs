//! API endpoints.

mod polls;
mod responses;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/polls",
        polls::router().nest("/responses", responses::router()),
    )
}
