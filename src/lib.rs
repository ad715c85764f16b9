pub mod auth;
pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod storage;
pub mod utils;

// Re-export commonly used items for convenience
pub use crate::config::ServerConfig;
pub use crate::core::pipeline::{Pipeline, PipelineFailure, PipelineSuccess};
pub use crate::errors::auth_error::AuthError;
pub use crate::errors::pipeline_error::{PipelineError, PipelineResult};
pub use crate::state::AppState;
