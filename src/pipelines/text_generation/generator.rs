use std::sync::{Arc, Mutex, MutexGuard};

use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;
use tokio::sync::mpsc;

use super::CompletionStream;
use crate::core::{EvaluatorError, Settings};
use crate::loaders::TokenizerLoader;
use crate::models::generation::{initialize_logits_processor, penalize_repeats, GenerationParams};
use crate::models::{collect_eos_tokens, CausalModel, LlamaModel, QuantizedLlamaModel};
use crate::pipelines::utils::release_device;

/// Backend that turns a prompt into streamed text.
///
/// `generate` is blocking and is always driven from a blocking task by
/// [`spawn_completion`]. Each decoded chunk is handed to `on_text`; returning
/// `false` from it stops generation early.
pub trait TextGenerator: Send + Sync + 'static {
    fn encode(&self, prompt: &str) -> Result<Vec<u32>, EvaluatorError>;

    fn generate(
        &self,
        prompt_tokens: &[u32],
        params: &GenerationParams,
        on_text: &mut dyn FnMut(String) -> bool,
    ) -> Result<(), EvaluatorError>;

    /// Give transient device memory back after a request.
    fn release(&self) -> Result<(), EvaluatorError> {
        Ok(())
    }
}

/// Runs `generator` on a blocking task and streams its chunks back.
///
/// The stream ends when generation finishes. A failed or panicked generation
/// surfaces as a final `Err` item.
pub fn spawn_completion(
    generator: Arc<dyn TextGenerator>,
    prompt_tokens: Vec<u32>,
    params: GenerationParams,
) -> CompletionStream<'static> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Result<String, EvaluatorError>>();

    let handle = tokio::task::spawn_blocking(move || {
        let result = generator.generate(&prompt_tokens, &params, &mut |chunk: String| {
            tx.send(Ok(chunk)).is_ok()
        });
        if let Err(err) = result {
            let _ = tx.send(Err(err));
        }
        drop(prompt_tokens);
        if let Err(err) = generator.release() {
            tracing::warn!("failed to release device memory: {err}");
        }
    });

    let stream = async_stream::stream! {
        while let Some(item) = rx.recv().await {
            yield item;
        }
        if let Err(join_err) = handle.await {
            yield Err(EvaluatorError::Channel(join_err.to_string()));
        }
    };

    CompletionStream::new(Box::pin(stream))
}

/// Candle-backed generator: one causal model plus its tokenizer.
pub struct CandleGenerator {
    model: Mutex<Box<dyn CausalModel>>,
    tokenizer: Tokenizer,
    eos_tokens: Vec<u32>,
    max_seq_len: usize,
    device: Device,
}

impl CandleGenerator {
    pub fn new(model: Box<dyn CausalModel>, tokenizer: Tokenizer) -> Self {
        let eos_tokens = collect_eos_tokens(&model.eos_token_ids(), &tokenizer);
        let max_seq_len = model.max_seq_len();
        let device = model.device().clone();

        Self {
            model: Mutex::new(model),
            tokenizer,
            eos_tokens,
            max_seq_len,
            device,
        }
    }

    /// Loads the tokenizer and a causal model as configured: GGUF when 4-bit
    /// quantization is permitted, full-precision safetensors otherwise.
    pub async fn load(settings: &Settings, device: Device) -> anyhow::Result<Self> {
        let tokenizer = TokenizerLoader::new(
            &settings.model_id,
            &settings.tokenizer_file,
            settings.hf_token.clone(),
        )
        .load()
        .await?;

        let model: Box<dyn CausalModel> = if settings.quantize() {
            Box::new(
                QuantizedLlamaModel::load(
                    &settings.model_id,
                    &settings.gguf_file,
                    settings.hf_token.clone(),
                    device,
                )
                .await?,
            )
        } else {
            Box::new(LlamaModel::load(&settings.model_id, settings.hf_token.clone(), device).await?)
        };

        let generator = Self::new(model, tokenizer);
        tracing::info!(
            eos = ?generator.eos_tokens,
            max_seq_len = generator.max_seq_len,
            "text generator ready"
        );
        Ok(generator)
    }

    // A panic mid-generation poisons the lock; the cache is reset before every
    // use, so the state behind it is still fine to reuse.
    fn lock_model(&self) -> MutexGuard<'_, Box<dyn CausalModel>> {
        self.model
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TextGenerator for CandleGenerator {
    fn encode(&self, prompt: &str) -> Result<Vec<u32>, EvaluatorError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| EvaluatorError::Tokenization(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn generate(
        &self,
        prompt_tokens: &[u32],
        params: &GenerationParams,
        on_text: &mut dyn FnMut(String) -> bool,
    ) -> Result<(), EvaluatorError> {
        if prompt_tokens.is_empty() {
            return Err(EvaluatorError::Tokenization(
                "prompt produced no tokens".to_string(),
            ));
        }
        if prompt_tokens.len() + params.max_new_tokens > self.max_seq_len {
            return Err(EvaluatorError::ContextOverflow {
                prompt_tokens: prompt_tokens.len(),
                max_new_tokens: params.max_new_tokens,
                max_seq_len: self.max_seq_len,
            });
        }

        let mut model = self.lock_model();
        model.reset()?;

        let mut logits_processor = initialize_logits_processor(params, params.call_seed());
        let mut decoder = self.tokenizer.decode_stream(true);
        let mut generated: Vec<u32> = Vec::with_capacity(params.max_new_tokens);

        // 1 x L
        let input = Tensor::new(prompt_tokens, &self.device)?.unsqueeze(0)?;
        // V
        let mut logits = model.forward(&input, 0)?.squeeze(0)?;
        drop(input);

        let mut index_pos = prompt_tokens.len();
        for step in 0..params.max_new_tokens {
            let penalized = penalize_repeats(logits, params, &generated)?;
            let next_token = logits_processor.sample(&penalized)?;
            if self.eos_tokens.contains(&next_token) {
                break;
            }
            generated.push(next_token);

            let chunk = decoder
                .step(next_token)
                .map_err(|e| EvaluatorError::Generation(e.to_string()))?;
            if let Some(text) = chunk {
                if !on_text(text) {
                    tracing::debug!("receiver dropped, stopping generation");
                    break;
                }
            }
            if step + 1 == params.max_new_tokens {
                break;
            }

            let input = Tensor::new(&[next_token], &self.device)?.unsqueeze(0)?;
            logits = model.forward(&input, index_pos)?.squeeze(0)?;
            index_pos += 1;
        }

        tracing::debug!(
            prompt_tokens = prompt_tokens.len(),
            new_tokens = generated.len(),
            "generation finished"
        );
        Ok(())
    }

    fn release(&self) -> Result<(), EvaluatorError> {
        release_device(&self.device).map_err(|e| EvaluatorError::Generation(e.to_string()))
    }
}
