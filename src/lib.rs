// src/lib.rs

pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod history;
pub mod models;
pub mod routes;
pub mod scoring;
pub mod shuffle;
pub mod state;
pub mod utils;

// Re-export specific items for convenience if needed
pub use routes::create_router;
