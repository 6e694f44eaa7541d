//! BERT-style sequence classification: encoder, pooler and a linear head.

use anyhow::{Error as E, Result};
use candle_core::{DType, Device, IndexOp, Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde::Deserialize;
use std::collections::HashMap;

use crate::loaders::{ConfigLoader, SafetensorsLoader};

/// Classification metadata that sits next to the encoder config in `config.json`.
#[derive(Debug, Deserialize)]
struct ClassifierConfigRaw {
    hidden_size: usize,
    #[serde(default)]
    max_position_embeddings: Option<usize>,
    #[serde(default)]
    id2label: Option<HashMap<String, String>>,
    #[serde(default)]
    num_labels: Option<usize>,
}

/// Orders `id2label` by numeric id. Ids that don't parse sort last.
pub fn ordered_labels(id2label: &HashMap<String, String>) -> Vec<String> {
    let mut pairs: Vec<(usize, &String)> = id2label
        .iter()
        .map(|(id, label)| (id.parse::<usize>().unwrap_or(usize::MAX), label))
        .collect();
    pairs.sort_by_key(|(id, _)| *id);
    pairs.into_iter().map(|(_, label)| label.clone()).collect()
}

pub struct BertSequenceClassifier {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    labels: Vec<String>,
    max_len: usize,
    device: Device,
    span: tracing::Span,
}

impl BertSequenceClassifier {
    pub async fn load(repo: &str, token: Option<String>, device: Device) -> Result<Self> {
        let config_content = ConfigLoader::new(repo, "config.json", token.clone())
            .load_raw()
            .await?;

        let bert_config: BertConfig = serde_json::from_str(&config_content)
            .map_err(|e| E::msg(format!("Failed to parse model config: {e}")))?;
        let class_cfg: ClassifierConfigRaw = serde_json::from_str(&config_content)
            .map_err(|e| E::msg(format!("Failed to parse classifier config: {e}")))?;

        let labels = class_cfg
            .id2label
            .as_ref()
            .map(ordered_labels)
            .unwrap_or_default();
        let num_labels = match (labels.len(), class_cfg.num_labels) {
            (0, Some(n)) => n,
            (0, None) => 2,
            (n, _) => n,
        };

        let weight_files = SafetensorsLoader::new(repo, token)
            .allow_pytorch(true)
            .load()
            .await?;

        let dtype = DType::F32;
        let vb = match weight_files.as_slice() {
            [single] if single.extension().is_some_and(|ext| ext == "bin") => {
                VarBuilder::from_pth(single, dtype, &device)?
            }
            files => unsafe { VarBuilder::from_mmaped_safetensors(files, dtype, &device)? },
        };

        let hidden = class_cfg.hidden_size;
        let bert = BertModel::load(vb.pp("bert"), &bert_config)?;
        let pooler = linear(hidden, hidden, vb.pp("bert.pooler.dense"))?;
        let classifier = linear(hidden, num_labels, vb.pp("classifier"))?;

        tracing::info!(repo, num_labels, "sequence classifier loaded");

        Ok(Self {
            bert,
            pooler,
            classifier,
            labels,
            max_len: class_cfg.max_position_embeddings.unwrap_or(512),
            device,
            span: tracing::span!(tracing::Level::TRACE, "bert-classifier"),
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Raw logits for a single already-tokenized sequence.
    pub fn forward(&self, token_ids: &[u32], attention_mask: &[u32]) -> Result<Vec<f32>> {
        let _enter = self.span.enter();

        let input_ids = Tensor::new(token_ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask = Tensor::new(attention_mask, &self.device)?.unsqueeze(0)?;

        // 1 x L x H
        let hidden = self
            .bert
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        // 1 x H, the [CLS] position
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        // 1 x num_labels
        let logits = self.classifier.forward(&pooled)?;

        Ok(logits.squeeze(0)?.to_dtype(DType::F32)?.to_vec1::<f32>()?)
    }
}
