//! Movies API endpoints.
//!
//! The catalog is append-only over HTTP: movies can be listed, retrieved,
//! created and given a poster, but never updated or deleted. The router only
//! registers the supported methods, so PUT/PATCH/DELETE answer 405.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    middleware as axum_mw,
    routing::{get, post},
    Extension, Json, Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::api::actors::ActorResponse;
use crate::db::models::{Genre, Movie};
use crate::db::queries::{self, MovieFilter, NewMovie, Relation};
use crate::error::{not_found_or, AppError, Result};
use crate::services::images;
use crate::services::Claims;
use crate::{middleware, AppState};

/// Room for multipart boundaries and headers on top of the image itself.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

/// Form field carrying the poster in an upload.
const IMAGE_FIELD: &str = "image";

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query parameters for listing movies.
#[derive(Debug, Default, Deserialize)]
pub struct ListMoviesQuery {
    /// Comma-separated genre ids; movies having any of them.
    pub genres: Option<String>,
    /// Comma-separated actor ids; movies featuring any of them.
    pub actors: Option<String>,
    /// Case-insensitive title substring.
    pub title: Option<String>,
}

impl ListMoviesQuery {
    fn into_filter(self) -> Result<MovieFilter> {
        Ok(MovieFilter {
            genres: parse_id_list("genres", self.genres.as_deref())?,
            actors: parse_id_list("actors", self.actors.as_deref())?,
            title: self.title.map(|t| t.trim().to_string()),
        })
    }
}

/// Request body for creating a movie.
#[derive(Debug, Deserialize)]
pub struct CreateMovieRequest {
    pub title: String,
    pub description: String,
    /// Running time in minutes.
    pub duration: u32,
    #[serde(default)]
    pub genres: Vec<i64>,
    #[serde(default)]
    pub actors: Vec<i64>,
}

/// Summary representation used by the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieListItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: u32,
    /// Genre names.
    pub genres: Vec<String>,
    /// Actor full names.
    pub actors: Vec<String>,
    pub image: Option<String>,
}

impl MovieListItem {
    pub fn load(conn: &Connection, movie: Movie) -> rusqlite::Result<Self> {
        let genres = queries::movie_genres(conn, movie.id)?
            .into_iter()
            .map(|g| g.name)
            .collect();
        let actors = queries::movie_actors(conn, movie.id)?
            .iter()
            .map(|a| a.full_name())
            .collect();

        Ok(Self {
            id: movie.id,
            image: movie.image.as_deref().map(images::media_url),
            title: movie.title,
            description: movie.description,
            duration: movie.duration,
            genres,
            actors,
        })
    }
}

/// Full representation used by the detail endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: u32,
    pub genres: Vec<Genre>,
    pub actors: Vec<ActorResponse>,
    pub image: Option<String>,
}

impl MovieDetail {
    pub fn load(conn: &Connection, movie: Movie) -> rusqlite::Result<Self> {
        let genres = queries::movie_genres(conn, movie.id)?;
        let actors = queries::movie_actors(conn, movie.id)?
            .into_iter()
            .map(ActorResponse::from)
            .collect();

        Ok(Self {
            id: movie.id,
            image: movie.image.as_deref().map(images::media_url),
            title: movie.title,
            description: movie.description,
            duration: movie.duration,
            genres,
            actors,
        })
    }
}

/// Representation returned after a create: relations as ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieWrite {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: u32,
    pub genres: Vec<i64>,
    pub actors: Vec<i64>,
}

impl MovieWrite {
    pub fn load(conn: &Connection, movie: Movie) -> rusqlite::Result<Self> {
        let genres = queries::movie_genres(conn, movie.id)?
            .iter()
            .map(|g| g.id)
            .collect();
        let actors = queries::movie_actors(conn, movie.id)?
            .iter()
            .map(|a| a.id)
            .collect();

        Ok(Self {
            id: movie.id,
            title: movie.title,
            description: movie.description,
            duration: movie.duration,
            genres,
            actors,
        })
    }
}

/// Poster state of a movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieImage {
    pub id: i64,
    pub image: Option<String>,
}

impl From<&Movie> for MovieImage {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            image: movie.image.as_deref().map(images::media_url),
        }
    }
}

// =============================================================================
// Router
// =============================================================================

pub fn router(state: AppState) -> Router<AppState> {
    let upload_limit = state.config.media.max_image_bytes + UPLOAD_OVERHEAD_BYTES;

    Router::new()
        .route(
            "/",
            get(list_movies).merge(middleware::staff_only(post(create_movie))),
        )
        .route("/:id", get(get_movie))
        .route(
            "/:id/upload-image",
            middleware::staff_only(post(upload_image))
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .layer(axum_mw::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ))
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/movies
///
/// Lists movies, optionally filtered by `genres`, `actors` and `title`.
pub async fn list_movies(
    State(state): State<AppState>,
    Query(query): Query<ListMoviesQuery>,
) -> Result<Json<Vec<MovieListItem>>> {
    let filter = query.into_filter()?;

    let db = state.db.lock().await;

    let items = queries::list_movies(&db, &filter)?
        .into_iter()
        .map(|movie| MovieListItem::load(&db, movie))
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Json(items))
}

/// GET /api/movies/:id
pub async fn get_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
) -> Result<Json<MovieDetail>> {
    let db = state.db.lock().await;

    let movie = queries::get_movie(&db, movie_id).map_err(not_found_or("Movie not found"))?;

    Ok(Json(MovieDetail::load(&db, movie)?))
}

/// POST /api/movies
///
/// Creates a movie with its genre and actor links (staff only).
pub async fn create_movie(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: std::result::Result<Json<CreateMovieRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MovieWrite>)> {
    let Json(body) = payload?;

    let title = body.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }

    let mut db = state.db.lock().await;

    for (relation, ids) in [
        (Relation::Genres, &body.genres),
        (Relation::Actors, &body.actors),
    ] {
        if let Some(id) = queries::missing_ids(&db, relation, ids)?.first() {
            return Err(AppError::BadRequest(format!(
                "Invalid pk \"{}\" in {:?} - object does not exist",
                id, relation
            )));
        }
    }

    let new_movie = NewMovie {
        title: title.to_string(),
        description: body.description,
        duration: body.duration,
        genres: body.genres,
        actors: body.actors,
    };

    let tx = db.transaction()?;
    let movie_id = queries::insert_movie(&tx, &new_movie)?;
    tx.commit()?;

    let movie = queries::get_movie(&db, movie_id)?;
    let created = MovieWrite::load(&db, movie)?;

    tracing::info!(
        movie_id = created.id,
        title = %created.title,
        genres = created.genres.len(),
        actors = created.actors.len(),
        created_by = claims.sub,
        "Movie created"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/movies/:id/upload-image
///
/// Stores the `image` field of a multipart body as the movie's poster (staff
/// only). A request without an image leaves the poster untouched.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
    multipart: Option<Multipart>,
) -> Result<Json<MovieImage>> {
    let movie = {
        let db = state.db.lock().await;
        queries::get_movie(&db, movie_id).map_err(not_found_or("Movie not found"))?
    };

    let Some(bytes) = read_image_field(multipart).await? else {
        tracing::debug!(movie_id, "Upload without image, poster unchanged");
        return Ok(Json(MovieImage::from(&movie)));
    };

    if bytes.is_empty() {
        return Err(AppError::BadRequest("The submitted file is empty".to_string()));
    }
    if bytes.len() > state.config.media.max_image_bytes {
        return Err(AppError::BadRequest(format!(
            "Image exceeds {} bytes",
            state.config.media.max_image_bytes
        )));
    }

    let format = images::detect_format(&bytes)?;
    let relative = images::poster_path(&movie.title, format);

    // Written before the row is updated so a failed write leaves the old poster
    state
        .image_store()
        .save(std::path::Path::new(&relative), &bytes)
        .await?;

    // Previous path is read under the same lock as the update
    let replaced = {
        let db = state.db.lock().await;
        queries::replace_movie_image(&db, movie_id, &relative)
    };
    let previous = match replaced {
        Ok(previous) => previous,
        Err(e) => {
            if let Err(cleanup) = state
                .image_store()
                .delete(std::path::Path::new(&relative))
                .await
            {
                tracing::warn!(movie_id, path = %relative, error = %cleanup, "Failed to remove orphaned poster");
            }
            return Err(not_found_or("Movie not found")(e));
        }
    };

    if let Some(previous) = previous.as_deref().filter(|p| *p != relative) {
        if let Err(e) = state
            .image_store()
            .delete(std::path::Path::new(previous))
            .await
        {
            tracing::warn!(movie_id, path = %previous, error = %e, "Failed to remove old poster");
        }
    }

    tracing::info!(movie_id, path = %relative, size = bytes.len(), "Movie poster uploaded");

    Ok(Json(MovieImage {
        id: movie_id,
        image: Some(images::media_url(&relative)),
    }))
}

// =============================================================================
// Helpers
// =============================================================================

/// Parses a comma-separated id list such as `"1, 2,3"`. Blank items are
/// skipped; a missing parameter yields an empty list.
fn parse_id_list(param: &str, raw: Option<&str>) -> Result<Vec<i64>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<i64>().map_err(|_| {
                AppError::BadRequest(format!("Invalid id '{}' in '{}'", item, param))
            })
        })
        .collect()
}

/// Returns the bytes of the first `image` field, if the request carried one.
async fn read_image_field(multipart: Option<Multipart>) -> Result<Option<Vec<u8>>> {
    let Some(mut multipart) = multipart else {
        return Ok(None);
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(Some(bytes.to_vec()));
        }
    }

    Ok(None)
}
