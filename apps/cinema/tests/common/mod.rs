//! Test infrastructure for cinema API integration tests.
//!
//! Provides a `TestApp` wrapper around `axum_test::TestServer` with helper methods
//! for creating users, seeding the catalog and making authenticated requests.

use axum_test::TestServer;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;

use cinema::config::{Config, DatabaseConfig, MediaConfig, ServerConfig};
use cinema::db::{self, models::UserRole};
use cinema::services::AuthService;
use cinema::{api, AppState};

const TEST_JWT_SECRET: &str = "test-jwt-secret-for-integration-tests";

/// Test application wrapper around axum_test::TestServer.
///
/// Each instance owns an in-memory database and a temporary media root, so
/// tests never share state.
pub struct TestApp {
    server: TestServer,
    db: Arc<Mutex<Connection>>,
    auth_service: Arc<AuthService>,
    media_dir: TempDir,
}

impl TestApp {
    /// Create a new test application with in-memory database.
    ///
    /// Uses the same router as the binary.
    pub async fn new() -> Self {
        let conn = db::init_db_memory().expect("Failed to initialize test database");
        let media_dir = TempDir::new().expect("Failed to create media directory");

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                jwt_secret: Some(TEST_JWT_SECRET.to_string()),
                ..Default::default()
            },
            database: DatabaseConfig {
                path: ":memory:".into(),
            },
            media: MediaConfig {
                root: media_dir.path().to_path_buf(),
                ..Default::default()
            },
        };

        let state = AppState::new(config, conn, AuthService::new(TEST_JWT_SECRET.to_string()));
        let db = Arc::clone(&state.db);
        let auth_service = Arc::clone(&state.auth_service);

        let server = TestServer::new(api::router(state)).expect("Failed to create test server");

        Self {
            server,
            db,
            auth_service,
            media_dir,
        }
    }

    /// Get a reference to the test server.
    pub fn server(&self) -> &TestServer {
        &self.server
    }

    /// Get a reference to the database connection.
    ///
    /// Useful for seeding test data or verifying database state.
    #[allow(dead_code)]
    pub fn db(&self) -> &Arc<Mutex<Connection>> {
        &self.db
    }

    /// Root directory uploaded images are written to.
    #[allow(dead_code)]
    pub fn media_root(&self) -> &Path {
        self.media_dir.path()
    }

    /// Create a test user in the database.
    ///
    /// Returns the user_id of the created user.
    pub async fn create_test_user(&self, email: &str, password: &str, is_staff: bool) -> i64 {
        let password_hash = self
            .auth_service
            .hash_password(password)
            .expect("Failed to hash password");

        let db = self.db.lock().await;
        db::queries::insert_user(&db, email, &password_hash, is_staff)
            .expect("Failed to create test user")
            .id
    }

    /// Generate a JWT token for the given user.
    pub fn get_auth_token(&self, user_id: i64, role: UserRole) -> String {
        self.auth_service
            .create_token(user_id, role)
            .expect("Failed to create token")
    }

    /// Create an Authorization header tuple for use with HTTP requests.
    ///
    /// ```ignore
    /// let (name, value) = app.auth_header(&token);
    /// let response = app.server().get("/api/movies").add_header(name, value).await;
    /// ```
    pub fn auth_header(&self, token: &str) -> (axum::http::HeaderName, axum::http::HeaderValue) {
        use axum::http::{header::AUTHORIZATION, HeaderValue};
        (
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).expect("Invalid token format"),
        )
    }

    /// Create a staff user and return their ID and auth token.
    #[allow(dead_code)]
    pub async fn create_staff(&self) -> (i64, String) {
        let user_id = self
            .create_test_user("admin@admin.com", "1qazcde3", true)
            .await;
        let token = self.get_auth_token(user_id, UserRole::Staff);
        (user_id, token)
    }

    /// Create a regular user and return their ID and auth token.
    #[allow(dead_code)]
    pub async fn create_user(&self) -> (i64, String) {
        let user_id = self
            .create_test_user("test@test.com", "testpass", false)
            .await;
        let token = self.get_auth_token(user_id, UserRole::User);
        (user_id, token)
    }

    /// Insert a movie with default description and duration.
    #[allow(dead_code)]
    pub async fn sample_movie(&self, title: &str) -> i64 {
        let db = self.db.lock().await;
        db::queries::insert_movie(
            &db,
            &db::queries::NewMovie {
                title: title.to_string(),
                description: "Test description".to_string(),
                duration: 120,
                genres: Vec::new(),
                actors: Vec::new(),
            },
        )
        .expect("Failed to create movie")
    }

    #[allow(dead_code)]
    pub async fn create_genre(&self, name: &str) -> i64 {
        let db = self.db.lock().await;
        db::queries::insert_genre(&db, name)
            .expect("Failed to create genre")
            .id
    }

    #[allow(dead_code)]
    pub async fn create_actor(&self, first_name: &str, last_name: &str) -> i64 {
        let db = self.db.lock().await;
        db::queries::insert_actor(&db, first_name, last_name)
            .expect("Failed to create actor")
            .id
    }

    #[allow(dead_code)]
    pub async fn add_genre(&self, movie_id: i64, genre_id: i64) {
        let db = self.db.lock().await;
        db::queries::add_movie_genre(&db, movie_id, genre_id).expect("Failed to link genre");
    }

    #[allow(dead_code)]
    pub async fn add_actor(&self, movie_id: i64, actor_id: i64) {
        let db = self.db.lock().await;
        db::queries::add_movie_actor(&db, movie_id, actor_id).expect("Failed to link actor");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_creation() {
        let app = TestApp::new().await;
        assert!(app.db.lock().await.is_autocommit());
        assert!(app.media_root().is_dir());
    }

    #[tokio::test]
    async fn test_create_test_user() {
        let app = TestApp::new().await;
        let user_id = app.create_test_user("someone@test.com", "pass1234", false).await;
        assert!(user_id > 0);

        let db = app.db.lock().await;
        let (email, is_staff): (String, bool) = db
            .query_row(
                "SELECT email, is_staff FROM users WHERE id = ?1",
                [user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("User not found");
        assert_eq!(email, "someone@test.com");
        assert!(!is_staff);
    }

    #[tokio::test]
    async fn test_get_auth_token() {
        let app = TestApp::new().await;
        let token = app.get_auth_token(1, UserRole::Staff);
        assert!(!token.is_empty());

        let claims = app
            .auth_service
            .verify_token(&token)
            .expect("Token should be valid");
        assert_eq!(claims.sub, 1);
        assert!(claims.is_staff());
    }

    #[tokio::test]
    async fn test_auth_header() {
        let app = TestApp::new().await;
        let token = app.get_auth_token(1, UserRole::User);
        let (name, value) = app.auth_header(&token);

        assert_eq!(name, axum::http::header::AUTHORIZATION);
        assert_eq!(
            value.to_str().unwrap(),
            format!("Bearer {}", token).as_str()
        );
    }

    #[tokio::test]
    async fn test_role_helpers() {
        let app = TestApp::new().await;
        let (_, staff_token) = app.create_staff().await;
        let (_, user_token) = app.create_user().await;

        let staff = app.auth_service.verify_token(&staff_token).unwrap();
        let user = app.auth_service.verify_token(&user_token).unwrap();
        assert_eq!(staff.role, UserRole::Staff);
        assert_eq!(user.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_health_check_endpoint() {
        let app = TestApp::new().await;
        let response = app.server().get("/health").await;

        response.assert_status_ok();
        response.assert_json_contains(&serde_json::json!({
            "message": "Cinema API is running"
        }));
    }
}
