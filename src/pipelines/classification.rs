use candle_core::Device;
use serde::{Deserialize, Serialize};
use tokenizers::{Tokenizer, TruncationDirection, TruncationParams};

use crate::core::{EvaluatorError, Settings};
use crate::loaders::TokenizerLoader;
use crate::models::BertSequenceClassifier;
use crate::pipelines::utils::release_device;

/// Raw classifier output: one logit per class, plus class names when the
/// checkpoint declares them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    pub logits: Vec<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// Backend that maps a whole prompt to a fixed-size logits vector.
pub trait SequenceClassifier: Send + Sync + 'static {
    fn classify(&self, text: &str) -> Result<ClassifierOutput, EvaluatorError>;
}

pub struct CandleClassifier {
    model: BertSequenceClassifier,
    tokenizer: Tokenizer,
}

impl CandleClassifier {
    pub async fn load(settings: &Settings, device: Device) -> anyhow::Result<Self> {
        let mut tokenizer = TokenizerLoader::new(
            &settings.model_id,
            &settings.tokenizer_file,
            settings.hf_token.clone(),
        )
        .load()
        .await?;

        let model =
            BertSequenceClassifier::load(&settings.model_id, settings.hf_token.clone(), device)
                .await?;

        keep_tail(&mut tokenizer, model.max_len()).map_err(anyhow::Error::msg)?;

        Ok(Self { model, tokenizer })
    }
}

/// Truncates encodings to `max_len` from the left. The rubric opens the prompt
/// and the job post and resume close it, so the tail is what carries the input.
fn keep_tail(tokenizer: &mut Tokenizer, max_len: usize) -> tokenizers::Result<()> {
    tokenizer.with_truncation(Some(TruncationParams {
        max_length: max_len,
        direction: TruncationDirection::Left,
        ..Default::default()
    }))?;
    tokenizer.with_padding(None);
    Ok(())
}

impl SequenceClassifier for CandleClassifier {
    fn classify(&self, text: &str) -> Result<ClassifierOutput, EvaluatorError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EvaluatorError::Tokenization(e.to_string()))?;

        let logits = self
            .model
            .forward(encoding.get_ids(), encoding.get_attention_mask())
            .map_err(|e| EvaluatorError::Generation(e.to_string()))?;
        let output = ClassifierOutput {
            logits,
            labels: self.model.labels().to_vec(),
        };
        Ok(after_release(output, release_device(self.model.device())))
    }
}

/// A failed release only costs device memory; the computed output still stands.
fn after_release<T>(output: T, released: anyhow::Result<()>) -> T {
    if let Err(err) = released {
        tracing::warn!("failed to release device memory: {err}");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_tokenizer(words: &[&str]) -> Tokenizer {
        let vocab: serde_json::Map<String, serde_json::Value> = std::iter::once("[UNK]")
            .chain(words.iter().copied())
            .enumerate()
            .map(|(id, word)| (word.to_string(), id.into()))
            .collect();
        let json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": {"type": "Whitespace"},
            "post_processor": null,
            "decoder": null,
            "model": {"type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]"}
        });
        Tokenizer::from_bytes(json.to_string()).unwrap()
    }

    #[test]
    fn truncation_keeps_job_post_and_resume() {
        let mut tokenizer = word_tokenizer(&["rubric", "job", "resume"]);
        keep_tail(&mut tokenizer, 4).unwrap();

        let prompt = format!("{} job job resume resume", "rubric ".repeat(50));
        let encoding = tokenizer.encode(prompt, true).unwrap();
        let tokens = encoding.get_tokens();

        assert_eq!(tokens, &["job", "job", "resume", "resume"]);
    }

    #[test]
    fn release_failure_keeps_logits() {
        let output = ClassifierOutput {
            logits: vec![1.5, -0.5],
            labels: vec!["fit".into(), "unfit".into()],
        };
        let kept = after_release(output.clone(), Err(anyhow::anyhow!("device lost")));
        assert_eq!(kept, output);
    }

    #[test]
    fn short_prompts_are_untouched() {
        let mut tokenizer = word_tokenizer(&["rubric", "resume"]);
        keep_tail(&mut tokenizer, 16).unwrap();

        let encoding = tokenizer.encode("rubric resume", true).unwrap();
        assert_eq!(encoding.get_tokens(), &["rubric", "resume"]);
    }
}
