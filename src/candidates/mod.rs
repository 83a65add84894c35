// src/candidates/mod.rs

pub mod handlers;
pub mod intake;
pub mod models;
pub mod routes;
pub mod validators;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use intake::IntakeService;
pub use routes::candidates_routes;
