pub mod completion_stream;
pub mod generator;

pub use completion_stream::CompletionStream;
pub use generator::{spawn_completion, CandleGenerator, TextGenerator};
