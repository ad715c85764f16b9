pub mod auth_error;
pub mod pipeline_error;

pub use auth_error::AuthError;
pub use pipeline_error::{PipelineError, PipelineResult};
