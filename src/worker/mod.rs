//! Dispatch loop: pulls jobs from a [`JobSource`], runs them through the
//! handler one at a time and hands the responses back.

pub mod http;
pub mod local;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::evaluator::Evaluator;
use crate::handler::{self, HandlerResponse, Job};

pub use http::{HttpJobQueue, HttpQueueConfig};
pub use local::LocalJobSource;

/// Where jobs come from and where their responses go.
#[async_trait]
pub trait JobSource: Send {
    /// The next job to run. `None` means the source is exhausted.
    async fn next_job(&mut self) -> anyhow::Result<Option<Job>>;

    async fn submit(&mut self, job_id: &str, response: &HandlerResponse) -> anyhow::Result<()>;
}

const FETCH_ERROR_DELAY: Duration = Duration::from_secs(1);

pub struct Worker<S: JobSource> {
    source: S,
    evaluator: Arc<Evaluator>,
    fetch_error_delay: Duration,
}

impl<S: JobSource> Worker<S> {
    pub fn new(source: S, evaluator: Arc<Evaluator>) -> Self {
        Self {
            source,
            evaluator,
            fetch_error_delay: FETCH_ERROR_DELAY,
        }
    }

    /// Pause after a failed fetch before asking the source again.
    pub fn fetch_error_delay(mut self, delay: Duration) -> Self {
        self.fetch_error_delay = delay;
        self
    }

    /// Processes jobs until the source is exhausted. Fetch and submit failures
    /// are logged and skipped; they never stop the loop.
    pub async fn run(&mut self) -> usize {
        let mut processed = 0;
        loop {
            let job = match self.source.next_job().await {
                Ok(Some(job)) => job,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!("failed to fetch job: {err:#}");
                    tokio::time::sleep(self.fetch_error_delay).await;
                    continue;
                }
            };

            tracing::info!(job_id = %job.id, "job received");
            let response = handler::handle(&job, &self.evaluator).await;

            if let Err(err) = self.source.submit(&job.id, &response).await {
                tracing::warn!(job_id = %job.id, "failed to submit response: {err:#}");
            } else {
                tracing::info!(job_id = %job.id, error = response.is_error(), "job finished");
            }
            processed += 1;
        }
        processed
    }

    pub fn into_source(self) -> S {
        self.source
    }
}
