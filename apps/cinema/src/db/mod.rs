//! Database module for the cinema API.
//!
//! SQLite connection setup with embedded migrations, plus the catalog models
//! and queries.

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::Path;

pub mod models;
pub mod queries;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("src/db/migrations");
}

/// SQL name of the Unicode-aware lowercase function. SQLite's own `lower()`
/// only folds ASCII.
pub const UNICODE_LOWER: &str = "unicode_lower";

/// Failures opening the database.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),
}

/// Opens the database file at `db_path`, creating it if needed, and brings
/// the schema up to date.
pub fn init_db<P: AsRef<Path>>(db_path: P) -> Result<Connection, DbError> {
    prepare(Connection::open(db_path)?)
}

/// Private in-memory database with the full schema. Used by tests.
pub fn init_db_memory() -> Result<Connection, DbError> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(mut conn: Connection) -> Result<Connection, DbError> {
    // WAL is ignored for in-memory databases
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )?;

    register_functions(&conn)?;

    let report = embedded::migrations::runner().run(&mut conn)?;
    for migration in report.applied_migrations() {
        tracing::info!(version = migration.version(), name = %migration.name(), "Applied migration");
    }

    Ok(conn)
}

fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
    )
}
