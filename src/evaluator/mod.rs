//! Resume/job-posting evaluation.
//!
//! An [`Evaluator`] owns one loaded backend and renders the same rubric prompt
//! for every request:
//!
//! - the generative backend streams a free-text evaluation from a causal model
//!   running on a blocking task, collected into one string;
//! - the classification backend runs a single forward pass and returns raw logits.
//!
//! `evaluate` never fails. Every error becomes an `"Error: <message>"` text result.

pub mod prompt;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::core::{EvaluatorError, EvaluatorKind, Settings};
use crate::models::generation::GenerationParams;
use crate::pipelines::{
    spawn_completion, CandleClassifier, CandleGenerator, ClassifierOutput, SequenceClassifier,
    TextGenerator,
};

pub use prompt::{PromptTemplate, EVALUATION_TEMPLATE};

/// What an evaluation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvaluationResult {
    /// Generated evaluation text, or `"Error: <message>"`.
    Text(String),
    Logits(ClassifierOutput),
}

impl EvaluationResult {
    pub fn error(err: impl std::fmt::Display) -> Self {
        EvaluationResult::Text(format!("Error: {err}"))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EvaluationResult::Text(text) => Some(text),
            EvaluationResult::Logits(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.as_text().is_some_and(|text| text.starts_with("Error: "))
    }
}

const INJECTED_MODEL_ID: &str = "injected";

#[derive(Clone)]
enum Backend {
    Generative(Arc<dyn TextGenerator>),
    Classification(Arc<dyn SequenceClassifier>),
}

/// Scores a resume against a job posting with one loaded model.
///
/// Built once per process and shared by reference; nothing in it changes after
/// construction.
#[derive(Clone)]
pub struct Evaluator {
    backend: Backend,
    template: Arc<PromptTemplate>,
    params: GenerationParams,
    model_id: String,
}

impl Evaluator {
    /// Wraps an already loaded text generator.
    pub fn generative(
        generator: Arc<dyn TextGenerator>,
        params: GenerationParams,
    ) -> Result<Self, EvaluatorError> {
        Ok(Self {
            backend: Backend::Generative(generator),
            template: Arc::new(PromptTemplate::new()?),
            params,
            model_id: INJECTED_MODEL_ID.to_string(),
        })
    }

    /// Wraps an already loaded sequence classifier.
    pub fn classification(classifier: Arc<dyn SequenceClassifier>) -> Result<Self, EvaluatorError> {
        Ok(Self {
            backend: Backend::Classification(classifier),
            template: Arc::new(PromptTemplate::new()?),
            params: GenerationParams::evaluation(),
            model_id: INJECTED_MODEL_ID.to_string(),
        })
    }

    /// Resolves the device and loads the configured backend from the Hub.
    pub async fn initialize(settings: &Settings) -> anyhow::Result<Self> {
        let device = settings.device_request().resolve()?;
        tracing::info!(
            model_id = %settings.model_id,
            kind = %settings.kind,
            quantize = settings.quantize(),
            device = ?device.location(),
            "initializing model and tokenizer"
        );

        let evaluator = match settings.kind {
            EvaluatorKind::Generative => {
                let generator = CandleGenerator::load(settings, device).await?;
                Self::generative(Arc::new(generator), GenerationParams::evaluation())?
            }
            EvaluatorKind::Classification => {
                let classifier = CandleClassifier::load(settings, device).await?;
                Self::classification(Arc::new(classifier))?
            }
        };

        tracing::info!("model and tokenizer loaded");
        Ok(evaluator.with_model_id(&settings.model_id))
    }

    /// Names the loaded model in evaluation logs.
    pub fn with_model_id(mut self, model_id: &str) -> Self {
        self.model_id = model_id.to_string();
        self
    }

    pub fn render_prompt(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<String, EvaluatorError> {
        self.template.render(resume_text, job_description)
    }

    /// Evaluates one resume against one job posting.
    pub async fn evaluate(&self, resume_text: &str, job_description: &str) -> EvaluationResult {
        let span = tracing::debug_span!("evaluate", model_id = %self.model_id);
        match self
            .try_evaluate(resume_text, job_description)
            .instrument(span)
            .await
        {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(model_id = %self.model_id, "evaluation failed: {err}");
                EvaluationResult::error(err)
            }
        }
    }

    async fn try_evaluate(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<EvaluationResult, EvaluatorError> {
        let prompt = self.render_prompt(resume_text, job_description)?;

        match &self.backend {
            Backend::Generative(generator) => {
                let tokens = generator.encode(&prompt)?;
                tracing::debug!(prompt_tokens = tokens.len(), "starting generation");

                let stream = spawn_completion(Arc::clone(generator), tokens, self.params.clone());
                Ok(EvaluationResult::Text(stream.collect().await?))
            }
            Backend::Classification(classifier) => {
                Ok(EvaluationResult::Logits(classifier.classify(&prompt)?))
            }
        }
    }
}
