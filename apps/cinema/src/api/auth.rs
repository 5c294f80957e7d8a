//! Authentication API endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::db::models::{normalize_email, User};
use crate::db::queries;
use crate::error::{not_found_or, AppError, Result};
use crate::services::Claims;
use crate::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response with JWT token.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

/// User information returned in responses (without password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub is_staff: bool,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_staff: user.is_staff,
        }
    }
}

/// POST /api/auth/login
///
/// Authenticates a user and returns a JWT token.
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(body) = payload?;
    let email = normalize_email(&body.email);

    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let credentials = {
        let db = state.db.lock().await;
        queries::find_credentials(&db, &email)?
    };

    let auth_service = state.auth_service();
    let (user, stored_hash) = credentials.unzip();

    let verified = auth_service.verify_credentials(&body.password, stored_hash.as_deref())?;
    let Some(user) = user.filter(|_| verified) else {
        tracing::debug!(email = %email, "Login rejected");
        return Err(AppError::Unauthorized);
    };

    let token = auth_service.create_token(user.id, user.role())?;

    tracing::info!(user_id = user.id, email = %user.email, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// GET /api/auth/me
///
/// Returns the current authenticated user's information.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserInfo>> {
    let db = state.db.lock().await;

    let user = queries::get_user(&db, claims.sub).map_err(not_found_or("User not found"))?;

    Ok(Json(user.into()))
}
