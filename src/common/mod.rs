// Common module - shared types and utilities across all modules

pub mod config;
pub mod error;
pub mod helpers;
pub mod id_generator;
pub mod migrations;
pub mod response;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod test_support;

// Re-export commonly used types for convenience
pub use error::ApiError;
pub use helpers::{now_rfc3339, safe_email_log};
pub use id_generator::*;
pub use response::ApiResponse;
pub use state::AppState;
pub use validation::{ValidationError, ValidationResult, Validator};
