// src/analyses/mod.rs

pub mod handlers;
pub mod models;
pub mod prompt;
pub mod repository;
pub mod routes;
pub mod service;
pub mod worker;

#[cfg(test)]
mod tests;

pub use routes::analyses_routes;
pub use service::AnalysisService;
pub use worker::{spawn_workers, AnalysisQueue};
