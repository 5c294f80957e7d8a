//! Account registration endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::api::auth::UserInfo;
use crate::db::models::normalize_email;
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 8;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/users/register
///
/// Creates a regular (non-staff) account. Staff accounts are provisioned at
/// startup or directly in the database.
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserInfo>)> {
    let Json(body) = payload?;
    let email = normalize_email(&body.email);

    if !is_plausible_email(&email) {
        return Err(AppError::BadRequest("Enter a valid email address".to_string()));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let password_hash = state.auth_service().hash_password(&body.password)?;

    let db = state.db.lock().await;

    if queries::email_exists(&db, &email)? {
        return Err(AppError::BadRequest(
            "User with this email already exists".to_string(),
        ));
    }

    let user = queries::insert_user(&db, &email, &password_hash, false)?;

    tracing::info!(user_id = user.id, email = %user.email, "User registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// One `@` with something on both sides.
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
