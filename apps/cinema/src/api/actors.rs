//! Actors API endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware as axum_mw,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::Actor;
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::{middleware, AppState};

/// Request body for creating an actor.
#[derive(Debug, Deserialize)]
pub struct CreateActorRequest {
    pub first_name: String,
    pub last_name: String,
}

/// Actor representation, including the display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<Actor> for ActorResponse {
    fn from(actor: Actor) -> Self {
        Self {
            full_name: actor.full_name(),
            id: actor.id,
            first_name: actor.first_name,
            last_name: actor.last_name,
        }
    }
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_actors).merge(middleware::staff_only(post(create_actor))))
        .layer(axum_mw::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ))
}

/// GET /api/actors
pub async fn list_actors(State(state): State<AppState>) -> Result<Json<Vec<ActorResponse>>> {
    let db = state.db.lock().await;
    let actors = queries::list_actors(&db)?
        .into_iter()
        .map(ActorResponse::from)
        .collect();
    Ok(Json(actors))
}

/// POST /api/actors
///
/// Creates an actor (staff only).
pub async fn create_actor(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateActorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ActorResponse>)> {
    let Json(body) = payload?;
    let first_name = body.first_name.trim();
    let last_name = body.last_name.trim();

    if first_name.is_empty() || last_name.is_empty() {
        return Err(AppError::BadRequest(
            "First and last name are required".to_string(),
        ));
    }

    let db = state.db.lock().await;
    let actor = queries::insert_actor(&db, first_name, last_name)?;

    tracing::info!(actor_id = actor.id, "Actor created");

    Ok((StatusCode::CREATED, Json(actor.into())))
}
