// src/candidates/handlers/mod.rs

pub mod applications;
pub mod files;
pub mod submissions;

// Re-export handler functions
pub use applications::*;
pub use files::*;
pub use submissions::*;
