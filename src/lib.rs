//! Serverless worker that scores a resume and cover letter against a job
//! posting with a locally loaded language model.
//!
//! The pieces, in call order:
//!
//! - [`worker`] pulls jobs from a queue (or a local test input);
//! - [`handler`] turns a job payload into an evaluation request and back into a response;
//! - [`evaluator`] renders the rubric prompt and runs the model;
//! - [`pipelines`] and [`models`] hold the candle-backed generation and classification code.

pub mod core;
pub mod evaluator;
pub mod handler;
mod loaders;
pub mod models;
pub mod pipelines;
pub mod worker;

pub use crate::core::{EvaluatorError, EvaluatorKind, JobError, Settings};
pub use evaluator::{EvaluationResult, Evaluator};
pub use handler::{handle, EvaluationRequest, HandlerResponse, Job};
pub use models::generation::GenerationParams;
pub use pipelines::{ClassifierOutput, SequenceClassifier, TextGenerator};
