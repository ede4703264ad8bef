use axum::Router;
use axum::routing::post;

use crate::AppState;

pub mod handler;
pub mod models;

pub fn get_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handler::login))
        .route("/logout", post(handler::logout))
}
