pub mod params;
pub mod sampling;

pub use params::GenerationParams;
pub use sampling::{initialize_logits_processor, penalize_repeats};
