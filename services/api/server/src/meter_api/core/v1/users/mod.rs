use axum::Router;
use axum::routing::{get, post};

use crate::AppState;

pub mod errors;
pub mod handler;
pub mod models;

pub fn get_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handler::register))
        .route("/users/all", get(handler::list_users))
        .route("/users/{id}", get(handler::get_user))
}
