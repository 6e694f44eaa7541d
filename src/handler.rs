//! Job payload handling: `{"input": {"resume", "jobpost"}}` in,
//! `{"result": ...}` or `{"error": ...}` out.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::core::JobError;
use crate::evaluator::{EvaluationResult, Evaluator};

pub const LOCAL_JOB_ID: &str = "local_test";

/// One unit of work delivered by the job queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(default = "local_job_id")]
    pub id: String,
    #[serde(default)]
    pub input: serde_json::Value,
}

fn local_job_id() -> String {
    LOCAL_JOB_ID.to_string()
}

/// The two fields read from `job.input`. Both must be present; either may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    #[serde(rename = "resume")]
    pub resume_text: String,
    #[serde(rename = "jobpost")]
    pub job_description: String,
}

impl EvaluationRequest {
    pub fn from_input(input: &serde_json::Value) -> Result<Self, JobError> {
        Ok(EvaluationRequest::deserialize(input)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerResponse {
    Result(EvaluationResult),
    Error(String),
}

impl HandlerResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, HandlerResponse::Error(_))
    }
}

/// Runs one job through the evaluator. Never fails and never panics: payload
/// errors and panics inside evaluation both come back as `{"error": ...}`.
pub async fn handle(job: &Job, evaluator: &Evaluator) -> HandlerResponse {
    let request = match EvaluationRequest::from_input(&job.input) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(job_id = %job.id, "rejecting job: {err}");
            return HandlerResponse::Error(err.to_string());
        }
    };

    tracing::debug!(
        job_id = %job.id,
        resume_len = request.resume_text.len(),
        jobpost_len = request.job_description.len(),
        "evaluating"
    );

    let evaluation = AssertUnwindSafe(
        evaluator.evaluate(&request.resume_text, &request.job_description),
    )
    .catch_unwind()
    .await;

    match evaluation {
        Ok(result) => HandlerResponse::Result(result),
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(job_id = %job.id, "evaluation panicked: {message}");
            HandlerResponse::Error(message)
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "evaluation panicked".to_string()
    }
}
