//! Model and tokenizer loading utilities for Hugging Face Hub integration.
//!
//! Every loader resolves a file inside a model repository through the async
//! `hf-hub` client, downloading it into the local cache on first use:
//!
//! - [`HfLoader`] - resolves a single repository file, with an optional access token
//! - [`TokenizerLoader`] - loads `tokenizer.json`
//! - [`ConfigLoader`] - reads and deserializes `config.json`
//! - [`GgufModelLoader`] - opens a GGUF weight file and parses its header
//! - [`SafetensorsLoader`] - resolves single-file or sharded safetensors weights
//!
//! Failures are returned as-is. There is no retry: a model that cannot be
//! resolved makes the worker fail at startup.

use hf_hub::api::tokio::ApiBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use tokenizers::Tokenizer;

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub filename: String,
    token: Option<String>,
}

impl HfLoader {
    pub fn new(repo: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            filename: filename.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Same repository and credentials, different file.
    pub fn sibling(&self, filename: &str) -> Self {
        Self {
            repo: self.repo.clone(),
            filename: filename.into(),
            token: self.token.clone(),
        }
    }

    pub async fn load(&self) -> anyhow::Result<PathBuf> {
        let hf_api = ApiBuilder::new()
            .with_token(self.token.clone())
            .with_chunk_size(None)
            .build()?;
        let hf_api = hf_api.model(self.repo.clone());

        tracing::debug!(repo = %self.repo, file = %self.filename, "resolving hub file");
        let path = hf_api.get(self.filename.as_str()).await?;
        Ok(path)
    }
}

#[derive(Clone)]
pub struct TokenizerLoader {
    pub tokenizer_file_loader: HfLoader,
}

impl TokenizerLoader {
    pub fn new(repo: &str, filename: &str, token: Option<String>) -> Self {
        Self {
            tokenizer_file_loader: HfLoader::new(repo, filename).with_token(token),
        }
    }

    pub async fn load(&self) -> anyhow::Result<Tokenizer> {
        let tokenizer_file_path = self.tokenizer_file_loader.load().await?;

        let tokenizer =
            tokenizers::Tokenizer::from_file(tokenizer_file_path).map_err(anyhow::Error::msg)?;

        Ok(tokenizer)
    }
}

/// Loads `config.json` (or any JSON file) into a typed config.
pub struct ConfigLoader {
    pub config_file_loader: HfLoader,
}

impl ConfigLoader {
    pub fn new(repo: &str, filename: &str, token: Option<String>) -> Self {
        Self {
            config_file_loader: HfLoader::new(repo, filename).with_token(token),
        }
    }

    /// Returns the raw file contents so callers can deserialize more than one view.
    pub async fn load_raw(&self) -> anyhow::Result<String> {
        let path = self.config_file_loader.load().await?;
        std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {path:?}: {e}"))
    }

    pub async fn load<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let content = self.load_raw().await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Clone)]
pub struct GgufModelLoader {
    pub model_file_loader: HfLoader,
}

impl GgufModelLoader {
    pub fn new(model_repo: &str, model_filename: &str, token: Option<String>) -> Self {
        Self {
            model_file_loader: HfLoader::new(model_repo, model_filename).with_token(token),
        }
    }

    pub async fn load(
        &self,
    ) -> anyhow::Result<(std::fs::File, candle_core::quantized::gguf_file::Content)> {
        let model_file_path = self.model_file_loader.load().await?;

        let mut file = std::fs::File::open(&model_file_path)?;
        let file_content = candle_core::quantized::gguf_file::Content::read(&mut file)
            .map_err(|e| e.with_path(model_file_path))?;

        Ok((file, file_content))
    }
}

const SAFETENSORS_INDEX: &str = "model.safetensors.index.json";
const SAFETENSORS_SINGLE: &str = "model.safetensors";
const PYTORCH_SINGLE: &str = "pytorch_model.bin";

#[derive(Deserialize)]
struct ShardIndex {
    weight_map: HashMap<String, String>,
}

/// Shard filenames referenced by a `model.safetensors.index.json`, deduplicated
/// and in a stable order.
pub fn shard_files(index_json: &str) -> anyhow::Result<Vec<String>> {
    let index: ShardIndex = serde_json::from_str(index_json)?;
    let files: BTreeSet<String> = index.weight_map.into_values().collect();
    if files.is_empty() {
        anyhow::bail!("{SAFETENSORS_INDEX} lists no weight files");
    }
    Ok(files.into_iter().collect())
}

/// Resolves the weight files of a full-precision checkpoint.
///
/// Tries a sharded index first, then a single safetensors file, and finally
/// (when `allow_pytorch` is set) a legacy `pytorch_model.bin`.
#[derive(Clone)]
pub struct SafetensorsLoader {
    pub index_loader: HfLoader,
    allow_pytorch: bool,
}

impl SafetensorsLoader {
    pub fn new(repo: &str, token: Option<String>) -> Self {
        Self {
            index_loader: HfLoader::new(repo, SAFETENSORS_INDEX).with_token(token),
            allow_pytorch: false,
        }
    }

    pub fn allow_pytorch(mut self, allow: bool) -> Self {
        self.allow_pytorch = allow;
        self
    }

    pub async fn load(&self) -> anyhow::Result<Vec<PathBuf>> {
        if let Ok(index_path) = self.index_loader.load().await {
            let index_json = std::fs::read_to_string(&index_path)?;
            let mut paths = Vec::new();
            for shard in shard_files(&index_json)? {
                paths.push(self.index_loader.sibling(&shard).load().await?);
            }
            return Ok(paths);
        }

        match self.index_loader.sibling(SAFETENSORS_SINGLE).load().await {
            Ok(path) => Ok(vec![path]),
            Err(_) if self.allow_pytorch => {
                match self.index_loader.sibling(PYTORCH_SINGLE).load().await {
                    Ok(path) => Ok(vec![path]),
                    Err(e) => anyhow::bail!(
                        "model weights not found in {}. Expected `{SAFETENSORS_SINGLE}` or `{PYTORCH_SINGLE}`. Error: {e}",
                        self.index_loader.repo
                    ),
                }
            }
            Err(e) => anyhow::bail!(
                "model weights not found in {}. Expected `{SAFETENSORS_INDEX}` or `{SAFETENSORS_SINGLE}`. Error: {e}",
                self.index_loader.repo
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_files_are_unique_and_sorted() {
        let index = r#"{
            "metadata": {"total_size": 16060522496},
            "weight_map": {
                "lm_head.weight": "model-00004-of-00004.safetensors",
                "model.embed_tokens.weight": "model-00001-of-00004.safetensors",
                "model.layers.0.mlp.up_proj.weight": "model-00001-of-00004.safetensors",
                "model.layers.20.mlp.up_proj.weight": "model-00003-of-00004.safetensors",
                "model.layers.9.mlp.up_proj.weight": "model-00002-of-00004.safetensors"
            }
        }"#;
        let files = shard_files(index).unwrap();
        assert_eq!(
            files,
            vec![
                "model-00001-of-00004.safetensors",
                "model-00002-of-00004.safetensors",
                "model-00003-of-00004.safetensors",
                "model-00004-of-00004.safetensors",
            ]
        );
    }

    #[test]
    fn empty_index_is_rejected() {
        assert!(shard_files(r#"{"weight_map": {}}"#).is_err());
    }

    #[test]
    fn sibling_keeps_repo_and_token() {
        let loader = HfLoader::new("org/model", "config.json").with_token(Some("t".into()));
        let sibling = loader.sibling("tokenizer.json");
        assert_eq!(sibling.repo, "org/model");
        assert_eq!(sibling.filename, "tokenizer.json");
        assert_eq!(sibling.token.as_deref(), Some("t"));
    }
}
