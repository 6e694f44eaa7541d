pub mod config;
pub mod error;

pub use config::{EvaluatorKind, Settings};
pub use error::{EvaluatorError, JobError};
