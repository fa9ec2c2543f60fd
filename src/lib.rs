//! Amana Association Management System
//!
//! A Rust implementation of the Amana association management server:
//! equipment lending with an availability-consistent loan lifecycle,
//! exposed as a REST JSON API, plus the typed HTTP client used by
//! frontend tooling.

use std::sync::Arc;

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
