//! Segment Server Library
//!
//! HTTP boundary for the segment membership service: request validation,
//! response shaping and configuration around the membership engine.
//!
//! This library exposes the core components for testing purposes.

pub mod api;
pub mod config;
pub mod error;
pub mod shutdown;
pub mod state;

// Re-export commonly used types for convenience
pub use api::create_router;
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use state::AppState;
