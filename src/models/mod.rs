pub mod bert_classifier;
pub mod generation;
pub mod llama;
pub mod quantized_llama;

pub use bert_classifier::BertSequenceClassifier;
pub use llama::LlamaModel;
pub use quantized_llama::QuantizedLlamaModel;

use candle_core::{Device, Tensor};

/// End-of-sequence tokens looked up in the tokenizer vocabulary, on top of
/// whatever the checkpoint itself declares.
pub const EOS_TOKEN_CANDIDATES: &[&str] = &["<|eot_id|>", "<|end_of_text|>", "</s>"];

/// Minimal interface the generator needs from a causal language model.
///
/// The full-precision and the GGUF Llama expose different forward signatures
/// and cache handling; this trait hides both behind the same call.
pub trait CausalModel: Send {
    /// Forward `input` (shape `1 x L`) starting at `index_pos`, returning the
    /// logits of the last position (shape `1 x V`).
    fn forward(&mut self, input: &Tensor, index_pos: usize) -> candle_core::Result<Tensor>;

    /// Drop the kv-cache so the next call starts a fresh sequence.
    fn reset(&mut self) -> candle_core::Result<()>;

    fn max_seq_len(&self) -> usize;

    /// EOS ids declared by the checkpoint.
    fn eos_token_ids(&self) -> Vec<u32>;

    fn device(&self) -> &Device;
}

/// Collects EOS ids from the model and the tokenizer vocabulary.
pub fn collect_eos_tokens(model_eos: &[u32], tokenizer: &tokenizers::Tokenizer) -> Vec<u32> {
    let mut eos: Vec<u32> = model_eos.to_vec();
    for candidate in EOS_TOKEN_CANDIDATES {
        if let Some(id) = tokenizer.token_to_id(candidate) {
            if !eos.contains(&id) {
                eos.push(id);
            }
        }
    }
    eos
}
