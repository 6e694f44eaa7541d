/// Sampling settings for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f64,
    pub top_k: usize, // 0 means disabled
    pub repeat_penalty: f32,
    pub repeat_last_n: usize,
    /// Pinned sampler seed. `None` draws a fresh seed for every call.
    pub seed: Option<u64>,
    pub max_new_tokens: usize,
}

impl GenerationParams {
    pub fn new(
        temperature: f64,
        top_k: usize,
        repeat_penalty: f32,
        repeat_last_n: usize,
        seed: Option<u64>,
        max_new_tokens: usize,
    ) -> Self {
        Self {
            temperature,
            top_k,
            repeat_penalty,
            repeat_last_n,
            seed,
            max_new_tokens,
        }
    }

    /// Settings the evaluation prompt is tuned for: 512 new tokens sampled at
    /// temperature 0.7 from the top 50 candidates.
    pub fn evaluation() -> Self {
        Self::new(0.7, 50, 1.0, 64, None, 512)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: usize) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    /// The seed for one call: the pinned one, or a fresh random draw.
    pub fn call_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random::<u64>)
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::evaluation()
    }
}
