//! Genres API endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware as axum_mw,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::Genre;
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::{middleware, AppState};

/// Request body for creating a genre.
#[derive(Debug, Deserialize)]
pub struct CreateGenreRequest {
    pub name: String,
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_genres).merge(middleware::staff_only(post(create_genre))))
        .layer(axum_mw::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ))
}

/// GET /api/genres
pub async fn list_genres(State(state): State<AppState>) -> Result<Json<Vec<Genre>>> {
    let db = state.db.lock().await;
    Ok(Json(queries::list_genres(&db)?))
}

/// POST /api/genres
///
/// Creates a genre (staff only). Names are unique.
pub async fn create_genre(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateGenreRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Genre>)> {
    let Json(body) = payload?;
    let name = body.name.trim();

    if name.is_empty() {
        return Err(AppError::BadRequest("Genre name is required".to_string()));
    }

    let db = state.db.lock().await;

    if queries::genre_exists(&db, name)? {
        return Err(AppError::BadRequest(
            "Genre with this name already exists".to_string(),
        ));
    }

    let genre = queries::insert_genre(&db, name)?;

    tracing::info!(genre_id = genre.id, name = %genre.name, "Genre created");

    Ok((StatusCode::CREATED, Json(genre)))
}
