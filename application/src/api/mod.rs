//! HTTP API definitions.

pub mod auth;

use axum::{
    routing::{get, post},
    Router,
};
use common::route;

/// Builds a [`Router`] serving the authentication endpoints.
pub fn routes() -> Router {
    Router::new()
        .route(route::LOGIN, post(auth::login))
        .route(route::REGISTER, post(auth::register))
        .route(route::ME, get(auth::me))
        .route(route::LOGOUT, post(auth::logout))
}
