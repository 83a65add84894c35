//! # Auth Module
//!
//! Request-scoped caller identity:
//! - JWT bearer token validation
//! - `AuthedUser` extractor for authenticated routes
//! - `AdminUser` extractor for back-office routes

pub mod extractors;
pub mod models;


pub use extractors::{AdminUser, AuthedUser};
pub use models::Claims;
