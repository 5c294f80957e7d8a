//! Request middleware for the cinema API.

pub mod auth;

pub use auth::{auth_middleware, require_staff, staff_only};
