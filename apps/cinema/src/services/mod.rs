//! Application services for the cinema API.

pub mod auth;
pub mod images;

pub use auth::{AuthService, Claims};
pub use images::{ImageStore, LocalImageStore};
