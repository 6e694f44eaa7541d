use clap::{Args, ValueEnum};

use crate::pipelines::utils::DeviceRequest;

pub const DEFAULT_MODEL_ID: &str = "ninky0/rezoom-llama3.1-8b-4bit-b16-merged";
pub const DEFAULT_GGUF_FILE: &str = "model-q4_k_m.gguf";
pub const DEFAULT_TOKENIZER_FILE: &str = "tokenizer.json";

/// Which evaluator backend to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EvaluatorKind {
    /// Causal language model, streams a free-text evaluation.
    #[default]
    Generative,
    /// Sequence-classification model, returns raw logits.
    Classification,
}

impl std::fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluatorKind::Generative => write!(f, "generative"),
            EvaluatorKind::Classification => write!(f, "classification"),
        }
    }
}

/// Model settings, read from flags or the process environment.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Hugging Face model repository to load.
    #[arg(long, env = "MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    /// Hub access token for gated or private repositories.
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    /// Force CPU execution. Only a case-insensitive "true" enables it.
    #[arg(
        long,
        env = "CPU_ONLY",
        default_value = "false",
        action = clap::ArgAction::Set,
        value_parser = parse_truthy
    )]
    pub cpu_only: bool,

    /// "1" disables 4-bit quantized loading; any other value permits it.
    #[arg(long = "no-bitsandbytes", env = "TRANSFORMERS_NO_BITSANDBYTES", default_value = "1")]
    pub no_bitsandbytes: String,

    /// GGUF file inside the model repository, used when quantization is permitted.
    #[arg(long, env = "MODEL_GGUF_FILE", default_value = DEFAULT_GGUF_FILE)]
    pub gguf_file: String,

    #[arg(long, env = "TOKENIZER_FILE", default_value = DEFAULT_TOKENIZER_FILE)]
    pub tokenizer_file: String,

    #[arg(long, env = "EVALUATOR_KIND", value_enum, default_value_t = EvaluatorKind::Generative)]
    pub kind: EvaluatorKind,

    /// Pin a CUDA device by ordinal instead of picking the first one.
    #[arg(long, env = "CUDA_DEVICE")]
    pub cuda_device: Option<usize>,
}

impl Settings {
    /// Whether the 4-bit quantized weights should be loaded.
    pub fn quantize(&self) -> bool {
        self.no_bitsandbytes.trim() != "1"
    }

    pub fn device_request(&self) -> DeviceRequest {
        match (self.cpu_only, self.cuda_device) {
            (true, _) => DeviceRequest::Cpu,
            (false, Some(ordinal)) => DeviceRequest::Cuda(ordinal),
            (false, None) => DeviceRequest::Default,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            hf_token: None,
            cpu_only: false,
            no_bitsandbytes: "1".to_string(),
            gguf_file: DEFAULT_GGUF_FILE.to_string(),
            tokenizer_file: DEFAULT_TOKENIZER_FILE.to_string(),
            kind: EvaluatorKind::Generative,
            cuda_device: None,
        }
    }
}

fn parse_truthy(value: &str) -> Result<bool, String> {
    Ok(value.trim().eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: Settings,
    }

    fn parse(args: &[&str]) -> Settings {
        let argv = std::iter::once("rezoom-worker").chain(args.iter().copied());
        TestCli::try_parse_from(argv).unwrap().settings
    }

    #[test]
    fn cpu_only_accepts_only_true() {
        assert!(parse(&["--cpu-only", "TRUE"]).cpu_only);
        assert!(parse(&["--cpu-only", "true"]).cpu_only);
        assert!(!parse(&["--cpu-only", "1"]).cpu_only);
        assert!(!parse(&["--cpu-only", "yes"]).cpu_only);
    }

    #[test]
    fn cpu_only_forces_cpu_request() {
        let settings = parse(&["--cpu-only", "true"]);
        assert!(matches!(settings.device_request(), DeviceRequest::Cpu));
    }

    #[test]
    fn cuda_ordinal_is_requested_unless_cpu_is_forced() {
        let settings = parse(&["--cuda-device", "1"]);
        assert!(matches!(settings.device_request(), DeviceRequest::Cuda(1)));

        let settings = parse(&["--cuda-device", "1", "--cpu-only", "true"]);
        assert!(matches!(settings.device_request(), DeviceRequest::Cpu));

        assert!(matches!(parse(&[]).device_request(), DeviceRequest::Default));
    }

    #[test]
    fn quantization_toggle() {
        assert!(!parse(&["--no-bitsandbytes", "1"]).quantize());
        assert!(parse(&["--no-bitsandbytes", "0"]).quantize());
    }

    #[test]
    fn kind_parses_from_value() {
        assert_eq!(
            parse(&["--kind", "classification"]).kind,
            EvaluatorKind::Classification
        );
    }
}
