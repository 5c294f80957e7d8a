use rand::Rng;
use rusqlite::Connection;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cinema::config::Config;
use cinema::db::{self, models::normalize_email, queries};
use cinema::services::AuthService;
use cinema::{api, AppState};

const DEFAULT_ADMIN_EMAIL: &str = "admin@cinema.local";

fn init_tracing() {
    // RUST_LOG overrides; default is debug for this crate, quieter for dependencies
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cinema=debug,tower_http=debug,axum=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Ensure at least one staff account exists.
fn ensure_staff_user(conn: &Connection, auth_service: &AuthService) {
    match queries::staff_exists(conn) {
        Ok(true) => {
            tracing::debug!("Staff user already exists");
            return;
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!("Failed to check for staff users: {}", e);
            return;
        }
    }

    let email = std::env::var("CINEMA_ADMIN_EMAIL")
        .map(|email| normalize_email(&email))
        .unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string());

    let password = std::env::var("CINEMA_ADMIN_PASSWORD").unwrap_or_else(|_| {
        let password = random_string(16);
        tracing::warn!("Generated staff password for {}: {}", email, password);
        tracing::warn!("Set CINEMA_ADMIN_PASSWORD environment variable to use a fixed password");
        password
    });

    let password_hash = match auth_service.hash_password(&password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Failed to hash staff password: {}", e);
            return;
        }
    };

    match queries::insert_user(conn, &email, &password_hash, true) {
        Ok(user) => tracing::info!(user_id = user.id, email = %user.email, "Created staff user"),
        Err(e) => tracing::error!("Failed to create staff user: {}", e),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    tracing::info!("Starting Cinema API v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::load() {
        Ok(cfg) => {
            tracing::info!("Configuration loaded successfully");
            tracing::debug!("Server: {}:{}", cfg.server.host, cfg.server.port);
            tracing::debug!("Database: {:?}", cfg.database.path);
            tracing::debug!("Media root: {:?}", cfg.media.root);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    for dir in [config.database.path.parent(), Some(config.media.root.as_path())]
        .into_iter()
        .flatten()
    {
        if dir.as_os_str().is_empty() || dir.exists() {
            continue;
        }
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::error!("Failed to create directory {:?}: {}", dir, e);
            std::process::exit(1);
        }
    }

    let conn = match db::init_db(&config.database.path) {
        Ok(conn) => {
            tracing::info!("Database initialized at {:?}", config.database.path);
            conn
        }
        Err(e) => {
            tracing::error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    // Development fallback: tokens are invalidated on restart
    let jwt_secret = config.server.jwt_secret.clone().unwrap_or_else(|| {
        tracing::warn!("No JWT secret configured, using random secret");
        tracing::warn!("Set CINEMA_SERVER__JWT_SECRET for production use");
        random_string(32)
    });

    let auth_service = AuthService::with_token_ttl(jwt_secret, config.token_ttl());

    ensure_staff_user(&conn, &auth_service);

    let addr = config.server_addr();
    let state = AppState::new(config, conn, auth_service);
    let app = api::router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Cinema API listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
