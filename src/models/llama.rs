//! Full-precision Llama checkpoints loaded from safetensors.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::llama::{Cache, Config, Llama, LlamaConfig, LlamaEosToks};

use super::CausalModel;
use crate::loaders::{ConfigLoader, SafetensorsLoader};

pub struct LlamaModel {
    model: Llama,
    cache: Cache,
    config: Config,
    dtype: DType,
    device: Device,
}

impl LlamaModel {
    pub async fn load(repo: &str, token: Option<String>, device: Device) -> anyhow::Result<Self> {
        let llama_config: LlamaConfig = ConfigLoader::new(repo, "config.json", token.clone())
            .load()
            .await?;
        let config = llama_config.into_config(false);

        // Half precision only where the kernels exist for it.
        let dtype = if device.is_cpu() {
            DType::F32
        } else {
            DType::F16
        };

        let weight_files = SafetensorsLoader::new(repo, token).load().await?;
        tracing::info!(
            repo,
            shards = weight_files.len(),
            ?dtype,
            "loading llama weights (this might take a while)"
        );

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weight_files, dtype, &device)? };
        let model = Llama::load(vb, &config)?;
        let cache = Cache::new(true, dtype, &config, &device)?;

        Ok(Self {
            model,
            cache,
            config,
            dtype,
            device,
        })
    }
}

impl CausalModel for LlamaModel {
    fn forward(&mut self, input: &Tensor, index_pos: usize) -> candle_core::Result<Tensor> {
        self.model.forward(input, index_pos, &mut self.cache)
    }

    fn reset(&mut self) -> candle_core::Result<()> {
        self.cache = Cache::new(true, self.dtype, &self.config, &self.device)?;
        Ok(())
    }

    fn max_seq_len(&self) -> usize {
        self.config.max_position_embeddings
    }

    fn eos_token_ids(&self) -> Vec<u32> {
        match &self.config.eos_token_id {
            Some(LlamaEosToks::Single(id)) => vec![*id],
            Some(LlamaEosToks::Multiple(ids)) => ids.clone(),
            None => Vec::new(),
        }
    }

    fn device(&self) -> &Device {
        &self.device
    }
}
