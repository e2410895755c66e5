use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::AppState;

pub mod auth;
mod error;
mod forms;
mod handlers;
mod routes;

pub use auth::AuthUser;
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let body_limit = state.upload_max_bytes;
    Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::feeds())
        .merge(routes::profiles())
        .merge(routes::posts())
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
