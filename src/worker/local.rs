use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;

use async_trait::async_trait;

use super::JobSource;
use crate::handler::{HandlerResponse, Job};

pub const DEFAULT_TEST_INPUT_FILE: &str = "test_input.json";

/// Runs a fixed list of jobs, printing each response as JSON on stdout.
///
/// This is the local test mode: the job comes from a flag or a
/// `test_input.json` file instead of the queue.
pub struct LocalJobSource {
    pending: VecDeque<Job>,
    responses: Vec<(String, HandlerResponse)>,
    echo: bool,
}

impl LocalJobSource {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            pending: jobs.into(),
            responses: Vec::new(),
            echo: true,
        }
    }

    /// Parses a single job, e.g. `{"input": {"resume": "...", "jobpost": "..."}}`.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let job: Job = serde_json::from_str(json)?;
        Ok(Self::new(vec![job]))
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read test input {path:?}: {e}"))?;
        Self::from_json(&json)
    }

    /// Keep responses in memory only.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn responses(&self) -> &[(String, HandlerResponse)] {
        &self.responses
    }
}

#[async_trait]
impl JobSource for LocalJobSource {
    async fn next_job(&mut self) -> anyhow::Result<Option<Job>> {
        Ok(self.pending.pop_front())
    }

    async fn submit(&mut self, job_id: &str, response: &HandlerResponse) -> anyhow::Result<()> {
        if self.echo {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, response)?;
            writeln!(stdout)?;
        }
        self.responses.push((job_id.to_string(), response.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_single_job() {
        let mut source =
            LocalJobSource::from_json(r#"{"input": {"resume": "r", "jobpost": "j"}}"#).unwrap();
        let job = source.next_job().await.unwrap().unwrap();
        assert_eq!(job.id, "local_test");
        assert_eq!(job.input["jobpost"], "j");
        assert!(source.next_job().await.unwrap().is_none());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(LocalJobSource::from_json("{not json").is_err());
    }
}
