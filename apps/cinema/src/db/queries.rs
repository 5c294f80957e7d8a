//! Catalog and account queries.
//!
//! Thin functions over a borrowed connection so handlers, startup code and
//! tests share one set of SQL statements. Callers decide how to map
//! `QueryReturnedNoRows`.

use rusqlite::{Connection, OptionalExtension, ToSql};

use super::models::{normalize_email, Actor, Genre, Movie, User};
use super::UNICODE_LOWER;

const MOVIE_COLUMNS: &str = "id, title, description, duration, image";

/// Filters accepted by the movie list.
///
/// Empty id lists and a missing title mean "no constraint"; all present
/// constraints must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieFilter {
    /// Movies having any of these genres.
    pub genres: Vec<i64>,
    /// Movies featuring any of these actors.
    pub actors: Vec<i64>,
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
}

/// Data needed to insert a movie together with its relations.
#[derive(Debug, Clone)]
pub struct NewMovie {
    pub title: String,
    pub description: String,
    pub duration: u32,
    pub genres: Vec<i64>,
    pub actors: Vec<i64>,
}

/// Related tables a movie links to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Genres,
    Actors,
}

impl Relation {
    fn table(self) -> &'static str {
        match self {
            Relation::Genres => "genres",
            Relation::Actors => "actors",
        }
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Maps a database row to a Movie struct.
fn map_movie_row(row: &rusqlite::Row) -> rusqlite::Result<Movie> {
    Ok(Movie {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        duration: row.get(3)?,
        image: row.get(4)?,
    })
}

fn map_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        is_staff: row.get(2)?,
        created_at: row.get(3)?,
    })
}

// =============================================================================
// Movies
// =============================================================================

/// Lists movies matching `filter`, ordered by id. Each movie appears once
/// regardless of how many of its genres or actors match.
pub fn list_movies(conn: &Connection, filter: &MovieFilter) -> rusqlite::Result<Vec<Movie>> {
    let mut clauses = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if !filter.genres.is_empty() {
        clauses.push(format!(
            "id IN (SELECT movie_id FROM movie_genres WHERE genre_id IN ({}))",
            placeholders(filter.genres.len())
        ));
        for id in &filter.genres {
            params.push(Box::new(*id));
        }
    }

    if !filter.actors.is_empty() {
        clauses.push(format!(
            "id IN (SELECT movie_id FROM movie_actors WHERE actor_id IN ({}))",
            placeholders(filter.actors.len())
        ));
        for id in &filter.actors {
            params.push(Box::new(*id));
        }
    }

    if let Some(title) = filter.title.as_deref().filter(|t| !t.is_empty()) {
        // instr() keeps '%' and '_' in user input literal
        clauses.push(format!("instr({UNICODE_LOWER}(title), {UNICODE_LOWER}(?)) > 0"));
        params.push(Box::new(title.to_string()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let query = format!("SELECT {MOVIE_COLUMNS} FROM movies {where_clause} ORDER BY id");

    let mut stmt = conn.prepare(&query)?;
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let movies = stmt
        .query_map(param_refs.as_slice(), map_movie_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(movies)
}

/// Fetches a single movie; `QueryReturnedNoRows` when absent.
pub fn get_movie(conn: &Connection, movie_id: i64) -> rusqlite::Result<Movie> {
    conn.query_row(
        &format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ?1"),
        [movie_id],
        map_movie_row,
    )
}

/// Genres attached to a movie, ordered by id.
pub fn movie_genres(conn: &Connection, movie_id: i64) -> rusqlite::Result<Vec<Genre>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT g.id, g.name
        FROM genres g
        JOIN movie_genres mg ON mg.genre_id = g.id
        WHERE mg.movie_id = ?1
        ORDER BY g.id
        "#,
    )?;

    let genres = stmt
        .query_map([movie_id], |row| {
            Ok(Genre {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(genres)
}

/// Actors attached to a movie, ordered by id.
pub fn movie_actors(conn: &Connection, movie_id: i64) -> rusqlite::Result<Vec<Actor>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT a.id, a.first_name, a.last_name
        FROM actors a
        JOIN movie_actors ma ON ma.actor_id = a.id
        WHERE ma.movie_id = ?1
        ORDER BY a.id
        "#,
    )?;

    let actors = stmt
        .query_map([movie_id], |row| {
            Ok(Actor {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(actors)
}

/// Returns the ids from `ids` that have no row in the related table.
pub fn missing_ids(conn: &Connection, relation: Relation, ids: &[i64]) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)",
        relation.table()
    ))?;

    let mut missing = Vec::new();
    for id in ids {
        let exists: bool = stmt.query_row([id], |row| row.get(0))?;
        if !exists && !missing.contains(id) {
            missing.push(*id);
        }
    }

    Ok(missing)
}

/// Inserts a movie and its genre/actor links, returning the new id.
///
/// Run inside a transaction when the links must be all-or-nothing.
pub fn insert_movie(conn: &Connection, movie: &NewMovie) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO movies (title, description, duration) VALUES (?1, ?2, ?3)",
        rusqlite::params![movie.title, movie.description, movie.duration],
    )?;
    let movie_id = conn.last_insert_rowid();

    for genre_id in &movie.genres {
        conn.execute(
            "INSERT OR IGNORE INTO movie_genres (movie_id, genre_id) VALUES (?1, ?2)",
            [movie_id, *genre_id],
        )?;
    }

    for actor_id in &movie.actors {
        conn.execute(
            "INSERT OR IGNORE INTO movie_actors (movie_id, actor_id) VALUES (?1, ?2)",
            [movie_id, *actor_id],
        )?;
    }

    Ok(movie_id)
}

/// Links an existing genre to a movie.
pub fn add_movie_genre(conn: &Connection, movie_id: i64, genre_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO movie_genres (movie_id, genre_id) VALUES (?1, ?2)",
        [movie_id, genre_id],
    )?;
    Ok(())
}

/// Links an existing actor to a movie.
pub fn add_movie_actor(conn: &Connection, movie_id: i64, actor_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO movie_actors (movie_id, actor_id) VALUES (?1, ?2)",
        [movie_id, actor_id],
    )?;
    Ok(())
}

/// Points the movie at a new image and returns the path it replaced.
/// `QueryReturnedNoRows` if the movie does not exist.
pub fn replace_movie_image(
    conn: &Connection,
    movie_id: i64,
    image: &str,
) -> rusqlite::Result<Option<String>> {
    let previous: Option<String> =
        conn.query_row("SELECT image FROM movies WHERE id = ?1", [movie_id], |row| row.get(0))?;
    conn.execute(
        "UPDATE movies SET image = ?1 WHERE id = ?2",
        rusqlite::params![image, movie_id],
    )?;
    Ok(previous)
}

// =============================================================================
// Genres & actors
// =============================================================================

pub fn list_genres(conn: &Connection) -> rusqlite::Result<Vec<Genre>> {
    let mut stmt = conn.prepare("SELECT id, name FROM genres ORDER BY id")?;
    let genres = stmt
        .query_map([], |row| {
            Ok(Genre {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(genres)
}

pub fn genre_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM genres WHERE name = ?1)",
        [name],
        |row| row.get(0),
    )
}

pub fn insert_genre(conn: &Connection, name: &str) -> rusqlite::Result<Genre> {
    conn.execute("INSERT INTO genres (name) VALUES (?1)", [name])?;
    Ok(Genre {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

pub fn list_actors(conn: &Connection) -> rusqlite::Result<Vec<Actor>> {
    let mut stmt = conn.prepare("SELECT id, first_name, last_name FROM actors ORDER BY id")?;
    let actors = stmt
        .query_map([], |row| {
            Ok(Actor {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(actors)
}

pub fn insert_actor(conn: &Connection, first_name: &str, last_name: &str) -> rusqlite::Result<Actor> {
    conn.execute(
        "INSERT INTO actors (first_name, last_name) VALUES (?1, ?2)",
        [first_name, last_name],
    )?;
    Ok(Actor {
        id: conn.last_insert_rowid(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    })
}

// =============================================================================
// Users
// =============================================================================

/// Looks up `(user, password_hash)` by email for login.
pub fn find_credentials(conn: &Connection, email: &str) -> rusqlite::Result<Option<(User, String)>> {
    conn.query_row(
        "SELECT id, email, is_staff, created_at, password_hash FROM users WHERE email = ?1",
        [normalize_email(email)],
        |row| Ok((map_user_row(row)?, row.get::<_, String>(4)?)),
    )
    .optional()
}

pub fn get_user(conn: &Connection, user_id: i64) -> rusqlite::Result<User> {
    conn.query_row(
        "SELECT id, email, is_staff, created_at FROM users WHERE id = ?1",
        [user_id],
        map_user_row,
    )
}

pub fn email_exists(conn: &Connection, email: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        [normalize_email(email)],
        |row| row.get(0),
    )
}

pub fn staff_exists(conn: &Connection) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE is_staff = 1)",
        [],
        |row| row.get(0),
    )
}

pub fn insert_user(
    conn: &Connection,
    email: &str,
    password_hash: &str,
    is_staff: bool,
) -> rusqlite::Result<User> {
    conn.execute(
        "INSERT INTO users (email, password_hash, is_staff) VALUES (?1, ?2, ?3)",
        rusqlite::params![normalize_email(email), password_hash, is_staff],
    )?;
    get_user(conn, conn.last_insert_rowid())
}
