//! Serverless job-queue client.
//!
//! The worker asks the queue for work with a GET on the job URL and reports
//! each result with a POST on the output URL. Both URLs come from the
//! environment as templates: `$RUNPOD_POD_ID` in the job URL is replaced by the
//! worker id, `$ID` in the output URL by the job id.

use std::time::Duration;

use async_trait::async_trait;
use clap::Args;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use super::JobSource;
use crate::core::JobError;
use crate::handler::{HandlerResponse, Job};

const WORKER_ID_PLACEHOLDER: &str = "$RUNPOD_POD_ID";
const JOB_ID_PLACEHOLDER: &str = "$ID";

#[derive(Debug, Clone, Args)]
pub struct HttpQueueConfig {
    /// Job URL template, polled for new work.
    #[arg(long, env = "RUNPOD_WEBHOOK_GET_JOB")]
    pub job_url: Option<String>,

    /// Output URL template, receives each job's response.
    #[arg(long, env = "RUNPOD_WEBHOOK_POST_OUTPUT")]
    pub output_url: Option<String>,

    #[arg(long, env = "RUNPOD_AI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "RUNPOD_POD_ID", default_value = "local-worker")]
    pub worker_id: String,

    /// Seconds to wait when the queue has no job.
    #[arg(long, default_value_t = 1)]
    pub poll_interval_secs: u64,
}

impl HttpQueueConfig {
    pub fn is_configured(&self) -> bool {
        self.job_url.is_some() && self.output_url.is_some()
    }
}

pub fn job_url(template: &str, worker_id: &str) -> String {
    template.replace(WORKER_ID_PLACEHOLDER, worker_id)
}

pub fn output_url(template: &str, job_id: &str) -> String {
    template.replace(JOB_ID_PLACEHOLDER, job_id)
}

/// Parses a job-fetch response body. An empty body means no job.
///
/// A body that does not fit [`Job`] but still names an id comes back as a job
/// with its raw `input`, so the handler can answer it with an error instead of
/// leaving it to time out upstream.
pub fn parse_job(body: &str) -> Result<Option<Job>, JobError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(body)?;
    match serde_json::from_value::<Job>(value.clone()) {
        Ok(job) => Ok(Some(job)),
        Err(err) => {
            let Some(id) = raw_job_id(&value) else {
                return Err(err.into());
            };
            tracing::warn!(job_id = %id, "malformed job body: {err}");
            Ok(Some(Job {
                id,
                input: value.get("input").cloned().unwrap_or(Value::Null),
            }))
        }
    }
}

fn raw_job_id(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[derive(Serialize)]
struct OutputBody<'a> {
    output: &'a HandlerResponse,
}

pub struct HttpJobQueue {
    client: Client,
    job_url: String,
    output_url_template: String,
    api_key: Option<String>,
    poll_interval: Duration,
}

impl HttpJobQueue {
    pub fn new(config: &HttpQueueConfig) -> anyhow::Result<Self> {
        let (Some(job_template), Some(output_template)) = (&config.job_url, &config.output_url)
        else {
            anyhow::bail!("job queue URLs are not configured");
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            job_url: job_url(job_template, &config.worker_id),
            output_url_template: output_template.clone(),
            api_key: config.api_key.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(reqwest::header::AUTHORIZATION, key.as_str()),
            None => request,
        }
    }

    async fn fetch_once(&self) -> Result<Option<Job>, JobError> {
        let response = self.authorize(self.client.get(&self.job_url)).send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(JobError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_job(&body)
    }
}

#[async_trait]
impl JobSource for HttpJobQueue {
    // The queue never runs dry; keep polling until a job shows up.
    async fn next_job(&mut self) -> anyhow::Result<Option<Job>> {
        loop {
            if let Some(job) = self.fetch_once().await? {
                return Ok(Some(job));
            }
            tracing::trace!("no job available, polling again");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn submit(&mut self, job_id: &str, response: &HandlerResponse) -> anyhow::Result<()> {
        let url = output_url(&self.output_url_template, job_id);
        let reply = self
            .authorize(self.client.post(&url))
            .json(&OutputBody { output: response })
            .send()
            .await
            .map_err(JobError::from)?;

        let status = reply.status();
        if !status.is_success() {
            let body = reply.text().await.unwrap_or_default();
            return Err(JobError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(())
    }
}
