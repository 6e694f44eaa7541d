// Integration tests for the evaluator, driven by mocked backends.

mod common;

use std::sync::Arc;

use common::{EncodeBehavior, MockClassifier, MockGenerator, JOB_POST, RESUME};
use rezoom_evaluator::{
    ClassifierOutput, EvaluationResult, Evaluator, EvaluatorError, GenerationParams,
};

fn params() -> GenerationParams {
    GenerationParams::evaluation().with_seed(42)
}

#[tokio::test]
async fn evaluate_concatenates_streamed_tokens() -> anyhow::Result<()> {
    let tokens = [
        "<result>\n",
        "<total_score>",
        "72",
        "</total_score>\n",
        "<opinion1> 홍길동",
        " 지원자는 적합합니다.</opinion1>\n",
        "</result>",
    ];
    let evaluator = Evaluator::generative(Arc::new(MockGenerator::yielding(&tokens)), params())?;

    let result = evaluator.evaluate(RESUME, JOB_POST).await;

    assert_eq!(result, EvaluationResult::Text(tokens.concat()));
    Ok(())
}

#[tokio::test]
async fn tokenizer_failure_becomes_error_string() -> anyhow::Result<()> {
    let generator = MockGenerator::yielding(&["never"]).with_encode(EncodeBehavior::Fail);
    let evaluator = Evaluator::generative(Arc::new(generator), params())?;

    let result = evaluator.evaluate(RESUME, JOB_POST).await;
    let text = result.as_text().expect("text result");

    assert!(text.starts_with("Error: "), "got {text:?}");
    assert!(text.contains("vocabulary file is corrupt"));
    Ok(())
}

#[tokio::test]
async fn generation_failure_becomes_error_string() -> anyhow::Result<()> {
    let generator = MockGenerator::yielding(&["partial"]).failing_generation(|| {
        EvaluatorError::ContextOverflow {
            prompt_tokens: 4000,
            max_new_tokens: 512,
            max_seq_len: 4096,
        }
    });
    let evaluator = Evaluator::generative(Arc::new(generator), params())?;

    let result = evaluator.evaluate(RESUME, JOB_POST).await;

    assert!(result.is_error());
    assert!(result.as_text().unwrap().contains("context window of 4096"));
    Ok(())
}

#[tokio::test]
async fn prompt_reaches_backend_with_inputs() -> anyhow::Result<()> {
    let generator = Arc::new(MockGenerator::yielding(&["ok"]));
    let evaluator = Evaluator::generative(generator.clone(), params())?;

    evaluator.evaluate("", JOB_POST).await;

    let prompt = generator.seen_prompt().expect("encode was called");
    assert!(prompt.contains(JOB_POST));
    assert!(prompt.contains("이력서 평가: 총점 50점"));
    assert!(prompt.contains("자기소개서 평가: 총점 50점"));
    assert!(prompt.ends_with("### Evaluation:"));
    Ok(())
}

#[tokio::test]
async fn new_token_cap_is_passed_to_backend() -> anyhow::Result<()> {
    let generator = Arc::new(MockGenerator::yielding(&["a", "b", "c", "d"]));
    let evaluator = Evaluator::generative(generator, params().with_max_new_tokens(2))?;

    let result = evaluator.evaluate(RESUME, JOB_POST).await;

    assert_eq!(result, EvaluationResult::Text("ab".into()));
    Ok(())
}

#[tokio::test]
async fn device_memory_is_released_after_each_call() -> anyhow::Result<()> {
    let generator = Arc::new(MockGenerator::yielding(&["x"]));
    let evaluator = Evaluator::generative(generator.clone(), params())?;

    evaluator.evaluate(RESUME, JOB_POST).await;
    evaluator.evaluate(RESUME, JOB_POST).await;

    assert_eq!(*generator.released.lock().unwrap(), 2);
    Ok(())
}

#[test]
fn default_params_match_the_evaluation_setup() {
    let params = GenerationParams::evaluation();
    assert_eq!(params.max_new_tokens, 512);
    assert_eq!(params.top_k, 50);
    assert!((params.temperature - 0.7).abs() < f64::EPSILON);
}

#[tokio::test]
async fn classification_returns_raw_logits() -> anyhow::Result<()> {
    let output = ClassifierOutput {
        logits: vec![-1.25, 0.5, 3.75],
        labels: vec!["low".into(), "mid".into(), "high".into()],
    };
    let evaluator = Evaluator::classification(Arc::new(MockClassifier {
        output: output.clone(),
    }))?;

    let result = evaluator.evaluate(RESUME, JOB_POST).await;

    assert_eq!(result, EvaluationResult::Logits(output));
    Ok(())
}
