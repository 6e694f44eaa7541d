//! 4-bit GGUF Llama checkpoints.

use candle_core::{Device, Tensor};
use candle_transformers::models::quantized_llama::{ModelWeights, MAX_SEQ_LEN};

use super::CausalModel;
use crate::loaders::GgufModelLoader;

const EOS_METADATA_KEY: &str = "tokenizer.ggml.eos_token_id";

pub struct QuantizedLlamaModel {
    weights: ModelWeights,
    eos_token_ids: Vec<u32>,
    device: Device,
}

impl QuantizedLlamaModel {
    pub async fn load(
        repo: &str,
        filename: &str,
        token: Option<String>,
        device: Device,
    ) -> anyhow::Result<Self> {
        let (mut file, content) = GgufModelLoader::new(repo, filename, token).load().await?;

        let eos_token_ids = content
            .metadata
            .get(EOS_METADATA_KEY)
            .and_then(|value| value.to_u32().ok())
            .into_iter()
            .collect();

        tracing::info!(
            repo,
            file = filename,
            tensors = content.tensor_infos.len(),
            "loading quantized llama weights (this might take a while)"
        );
        let weights = ModelWeights::from_gguf(content, &mut file, &device)?;

        Ok(Self {
            weights,
            eos_token_ids,
            device,
        })
    }
}

impl CausalModel for QuantizedLlamaModel {
    fn forward(&mut self, input: &Tensor, index_pos: usize) -> candle_core::Result<Tensor> {
        self.weights.forward(input, index_pos)
    }

    // The GGUF weights discard their kv-cache whenever a forward starts at
    // position 0, so there is nothing to drop here.
    fn reset(&mut self) -> candle_core::Result<()> {
        Ok(())
    }

    fn max_seq_len(&self) -> usize {
        MAX_SEQ_LEN
    }

    fn eos_token_ids(&self) -> Vec<u32> {
        self.eos_token_ids.clone()
    }

    fn device(&self) -> &Device {
        &self.device
    }
}
