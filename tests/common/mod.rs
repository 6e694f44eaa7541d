#![allow(dead_code)]

use std::sync::Mutex;

use rezoom_evaluator::{
    ClassifierOutput, EvaluatorError, GenerationParams, SequenceClassifier, TextGenerator,
};

/// What the mocked tokenizer should do when asked to encode.
#[derive(Clone, Copy)]
pub enum EncodeBehavior {
    Ok,
    Fail,
    Panic,
}

/// Generator that replays a fixed token sequence and records the prompt it saw.
pub struct MockGenerator {
    pub tokens: Vec<String>,
    pub encode: EncodeBehavior,
    pub generate_error: Option<fn() -> EvaluatorError>,
    pub seen_prompt: Mutex<Option<String>>,
    pub released: Mutex<usize>,
}

impl MockGenerator {
    pub fn yielding(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            encode: EncodeBehavior::Ok,
            generate_error: None,
            seen_prompt: Mutex::new(None),
            released: Mutex::new(0),
        }
    }

    pub fn with_encode(mut self, behavior: EncodeBehavior) -> Self {
        self.encode = behavior;
        self
    }

    pub fn failing_generation(mut self, error: fn() -> EvaluatorError) -> Self {
        self.generate_error = Some(error);
        self
    }

    pub fn seen_prompt(&self) -> Option<String> {
        self.seen_prompt.lock().unwrap().clone()
    }
}

impl TextGenerator for MockGenerator {
    fn encode(&self, prompt: &str) -> Result<Vec<u32>, EvaluatorError> {
        *self.seen_prompt.lock().unwrap() = Some(prompt.to_string());
        match self.encode {
            EncodeBehavior::Ok => Ok((0..prompt.chars().count() as u32).collect()),
            EncodeBehavior::Fail => Err(EvaluatorError::Tokenization(
                "vocabulary file is corrupt".to_string(),
            )),
            EncodeBehavior::Panic => panic!("tokenizer blew up"),
        }
    }

    fn generate(
        &self,
        _prompt_tokens: &[u32],
        params: &GenerationParams,
        on_text: &mut dyn FnMut(String) -> bool,
    ) -> Result<(), EvaluatorError> {
        if let Some(error) = self.generate_error {
            return Err(error());
        }
        for token in self.tokens.iter().take(params.max_new_tokens) {
            if !on_text(token.clone()) {
                break;
            }
        }
        Ok(())
    }

    fn release(&self) -> Result<(), EvaluatorError> {
        *self.released.lock().unwrap() += 1;
        Ok(())
    }
}

pub struct MockClassifier {
    pub output: ClassifierOutput,
}

impl SequenceClassifier for MockClassifier {
    fn classify(&self, text: &str) -> Result<ClassifierOutput, EvaluatorError> {
        if text.is_empty() {
            return Err(EvaluatorError::Tokenization("empty input".to_string()));
        }
        Ok(self.output.clone())
    }
}

pub const JOB_POST: &str = "[채용] Rust 백엔드 개발자\n자격요건: 경력 3년 이상, tokio 경험\n우대사항: candle 사용 경험";
pub const RESUME: &str = "홍길동\n경력: 4년 (Rust, Go)\n자기소개: 성실하게 일해 왔습니다.";
