use candle_core::Tensor;
use candle_transformers::generation::{LogitsProcessor, Sampling};

use super::GenerationParams;

/// Builds a logits processor matching the sampling settings.
pub fn initialize_logits_processor(params: &GenerationParams, seed: u64) -> LogitsProcessor {
    let sampling = if params.temperature <= 0. {
        Sampling::ArgMax
    } else if params.top_k > 0 {
        Sampling::TopK {
            k: params.top_k,
            temperature: params.temperature,
        }
    } else {
        Sampling::All {
            temperature: params.temperature,
        }
    };
    LogitsProcessor::from_sampling(seed, sampling)
}

/// Penalizes the last `repeat_last_n` generated tokens, if a penalty is set.
pub fn penalize_repeats(
    logits: Tensor,
    params: &GenerationParams,
    generated: &[u32],
) -> candle_core::Result<Tensor> {
    let start_at = generated.len().saturating_sub(params.repeat_last_n);
    let penalty_context = &generated[start_at..];

    if params.repeat_penalty <= 1. || penalty_context.is_empty() {
        Ok(logits)
    } else {
        candle_transformers::utils::apply_repeat_penalty(
            &logits,
            params.repeat_penalty,
            penalty_context,
        )
    }
}
