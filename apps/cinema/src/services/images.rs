//! Poster image storage.
//!
//! Uploaded posters are validated by content, named after the movie title and
//! written below the media root, which is served under [`MEDIA_URL_PREFIX`].

use async_trait::async_trait;
use image::ImageFormat;
use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, Result};

/// URL prefix the media root is mounted at.
pub const MEDIA_URL_PREFIX: &str = "/media";

/// Directory below the media root holding movie posters.
const MOVIE_IMAGE_DIR: &str = "movies";

/// Storage backend for uploaded images. Paths are relative to the store root.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Writes `bytes` to `path`, creating parent directories as needed.
    async fn save(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Removes the file at `path`.
    async fn delete(&self, path: &Path) -> Result<()>;
}

/// Image store on the local filesystem.
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolves `path` below the root, rejecting anything that could escape it.
    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        for component in path.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(AppError::BadRequest(format!(
                        "Invalid media path component: {:?}",
                        component
                    )));
                }
            }
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let full_path = self.resolve(path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Internal(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }

        tokio::fs::write(&full_path, bytes).await.map_err(|e| {
            AppError::Internal(format!("Failed to write image {:?}: {}", full_path, e))
        })?;

        tracing::debug!(path = ?full_path, size = bytes.len(), "Image written");
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let full_path = self.resolve(path)?;

        tokio::fs::remove_file(&full_path).await.map_err(|e| {
            AppError::Internal(format!("Failed to delete image {:?}: {}", full_path, e))
        })?;

        tracing::debug!(path = ?full_path, "Image deleted");
        Ok(())
    }
}

/// Detects the image format from the file contents.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat> {
    image::guess_format(bytes)
        .map_err(|_| AppError::BadRequest("Upload a valid image".to_string()))
}

/// Lowercases `title` and collapses every run of non-alphanumeric characters
/// into a single hyphen.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        slug.push_str("movie");
    }
    slug
}

/// Builds a unique poster path, relative to the media root, for a movie.
pub fn poster_path(title: &str, format: ImageFormat) -> String {
    let extension = format.extensions_str().first().copied().unwrap_or("img");
    format!(
        "{}/{}-{}.{}",
        MOVIE_IMAGE_DIR,
        slugify(title),
        uuid::Uuid::new_v4(),
        extension
    )
}

/// Public URL of a stored image.
pub fn media_url(relative: &str) -> String {
    format!("{}/{}", MEDIA_URL_PREFIX, relative.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Test title"), "test-title");
        assert_eq!(slugify("  Ricardo's   Movie!! "), "ricardo-s-movie");
        assert_eq!(slugify("???"), "movie");
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(PNG_SIGNATURE).unwrap(), ImageFormat::Png);
        assert!(matches!(
            detect_format(b"definitely not an image"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_poster_path_shape() {
        let path = poster_path("First Movie", ImageFormat::Png);

        let name = path.strip_prefix("movies/").expect("stored under movies/");
        assert!(name.starts_with("first-movie-"));
        assert!(name.ends_with(".png"));

        assert_ne!(path, poster_path("First Movie", ImageFormat::Png));
    }

    #[test]
    fn test_media_url() {
        assert_eq!(media_url("movies/a.png"), "/media/movies/a.png");
    }

    #[tokio::test]
    async fn test_local_store_save_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path().to_path_buf());
        let path = Path::new("movies/poster.png");

        store.save(path, PNG_SIGNATURE).await.unwrap();
        assert_eq!(
            std::fs::read(dir.path().join(path)).unwrap(),
            PNG_SIGNATURE
        );

        store.delete(path).await.unwrap();
        assert!(!dir.path().join(path).exists());
        assert!(store.delete(path).await.is_err());
    }

    #[tokio::test]
    async fn test_local_store_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path().to_path_buf());

        let result = store.save(Path::new("../outside.png"), PNG_SIGNATURE).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result = store.save(Path::new("/etc/outside.png"), PNG_SIGNATURE).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
