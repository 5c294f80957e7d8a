//! Cinema catalog API.
//!
//! A movie catalog served over HTTP: movies with their genres and actors,
//! token authentication, and staff-only writes. The library exposes the
//! modules and router so integration tests run against the real service.

use axum::response::Json;
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod services;

use config::Config;
use services::{AuthService, ImageStore, LocalImageStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<Mutex<Connection>>,
    pub auth_service: Arc<AuthService>,
    pub image_store: Arc<dyn ImageStore>,
}

impl AppState {
    /// Builds the state with a local image store rooted at `config.media.root`.
    pub fn new(config: Config, conn: Connection, auth_service: AuthService) -> Self {
        let image_store = LocalImageStore::new(config.media.root.clone());
        Self {
            config: Arc::new(config),
            db: Arc::new(Mutex::new(conn)),
            auth_service: Arc::new(auth_service),
            image_store: Arc::new(image_store),
        }
    }

    /// Get a reference to the auth service.
    pub fn auth_service(&self) -> &AuthService {
        &self.auth_service
    }

    /// Get a reference to the image store.
    pub fn image_store(&self) -> &dyn ImageStore {
        self.image_store.as_ref()
    }
}

#[derive(Serialize)]
pub struct ApiResponse {
    pub message: String,
    pub version: String,
}

pub async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse {
        message: "Cinema API is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
