pub mod classification;
pub mod text_generation;
pub mod utils;

pub use classification::{CandleClassifier, ClassifierOutput, SequenceClassifier};
pub use text_generation::{spawn_completion, CandleGenerator, CompletionStream, TextGenerator};
pub use utils::DeviceRequest;
