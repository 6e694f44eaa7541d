use thiserror::Error;

/// Failure raised while turning a request into an evaluation.
///
/// None of these reach the caller as-is: the evaluator flattens every variant
/// into an `"Error: <message>"` result.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    /// The prompt template failed to render.
    #[error("prompt rendering failed: {0}")]
    Prompt(#[from] minijinja::Error),

    /// The tokenizer rejected the rendered prompt.
    #[error("tokenization failed: {0}")]
    Tokenization(String),

    /// The model failed mid-generation.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Prompt plus the new-token cap does not fit the model's window.
    #[error("prompt of {prompt_tokens} tokens plus {max_new_tokens} new tokens exceeds the context window of {max_seq_len}")]
    ContextOverflow {
        prompt_tokens: usize,
        max_new_tokens: usize,
        max_seq_len: usize,
    },

    #[error(transparent)]
    Model(#[from] candle_core::Error),

    /// The background generation task went away without finishing.
    #[error("generation task ended unexpectedly: {0}")]
    Channel(String),
}

/// Failure in the job plumbing between the queue and the handler.
#[derive(Debug, Error)]
pub enum JobError {
    /// The job payload did not match the expected schema.
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("job queue returned status {status}: {body}")]
    Status { status: u16, body: String },
}
