//! HTTP server module for the reservation service.
//!
//! Provides:
//! - Application state shared across handlers
//! - Error-to-response mapping
//! - Router configuration

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
