use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/signup/", get(handlers::signup_form).post(handlers::signup))
        .route("/auth/login/", get(handlers::login_form).post(handlers::login))
        .route("/auth/logout/", get(handlers::logout))
}

pub fn feeds() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/group/:slug/", get(handlers::group_posts))
        .route("/follow/", get(handlers::follow_index))
}

pub fn profiles() -> Router<AppState> {
    Router::new()
        .route("/profile/:username/", get(handlers::profile))
        .route("/profile/:username/follow/", get(handlers::profile_follow))
        .route("/profile/:username/unfollow/", get(handlers::profile_unfollow))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route(
            "/create/",
            get(handlers::post_create_form).post(handlers::post_create),
        )
        .route("/posts/:post_id/", get(handlers::post_detail))
        .route(
            "/posts/:post_id/edit/",
            get(handlers::post_edit_form).post(handlers::post_edit),
        )
        .route("/posts/:post_id/delete/", post(handlers::post_delete))
        .route(
            "/posts/:post_id/comment/",
            get(handlers::comment_redirect).post(handlers::add_comment),
        )
}
