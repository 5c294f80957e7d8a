//! API endpoint handlers for the cinema service.

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::services::images::MEDIA_URL_PREFIX;
use crate::{health_check, middleware, AppState};

pub mod actors;
pub mod auth;
pub mod genres;
pub mod movies;
pub mod users;

/// Builds the complete application router.
///
/// Shared by the binary and the integration tests so both exercise the same
/// routes and layers.
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route(
            "/me",
            get(auth::me).layer(axum_mw::from_fn_with_state(
                state.clone(),
                middleware::auth_middleware,
            )),
        );

    let user_routes = Router::new().route("/register", post(users::register));

    let media = ServeDir::new(&state.config.media.root);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/movies", movies::router(state.clone()))
        .nest("/api/genres", genres::router(state.clone()))
        .nest("/api/actors", actors::router(state.clone()))
        .nest_service(MEDIA_URL_PREFIX, media)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
