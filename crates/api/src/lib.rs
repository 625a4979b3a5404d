//! VidVault API Library
//!
//! This crate contains the API server components for VidVault.

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod geo;
pub mod media;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
