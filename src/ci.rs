//! CI platform collaborator.
//!
//! The image gate asks the CI platform whether the pipeline for a given tag
//! has come up green. One probe is a single HTTP round trip; the bounded
//! polling discipline lives in [`crate::connector`], not here.
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::GateError;

/// Answers "has the pipeline for this tag succeeded yet?".
pub trait PipelineGate {
    /// Ok when the pipeline for `tag` under `project_id` reports success;
    /// otherwise an error describing why not (missing, running, failed).
    fn pipeline_succeeded(&self, project_id: u64, tag: &str) -> Result<(), GateError>;
}

/// CI platform connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CiConfig {
    /// Base URL of the CI platform.
    pub base_url: String,
    /// API token.
    pub token: String,
    /// Project whose pipelines gate the image.
    pub project_id: u64,
}

#[derive(Debug, Deserialize)]
struct PipelineSummary {
    status: String,
}

/// GitLab pipelines API client.
pub struct GitlabGate {
    base_url: String,
    token: String,
    client: Client,
}

impl GitlabGate {
    /// Builds a client from config.
    pub fn new(config: &CiConfig) -> Result<Self, GateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            client,
        })
    }
}

impl PipelineGate for GitlabGate {
    fn pipeline_succeeded(&self, project_id: u64, tag: &str) -> Result<(), GateError> {
        let url = format!(
            "{}/api/v4/projects/{project_id}/pipelines?ref={tag}",
            self.base_url
        );
        let pipelines: Vec<PipelineSummary> = self
            .client
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()?
            .error_for_status()?
            .json()?;

        // The API returns newest first.
        match pipelines.first() {
            None => Err(GateError::PipelineMissing(tag.to_string())),
            Some(p) if p.status == "success" => Ok(()),
            Some(p) => Err(GateError::PipelineNotGreen {
                tag: tag.to_string(),
                status: p.status.clone(),
            }),
        }
    }
}
