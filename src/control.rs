//! Service control plane collaborator.
//!
//! The cluster manager exposes a small HTTP surface for stopping, starting,
//! and re-imaging services. Stop of an already-stopped service and start of
//! an already-started service are no-ops on the manager side; the
//! orchestrator relies on that when composite operations stop twice.
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::ControlPlaneError;
use crate::inventory::Service;

/// Operations the orchestrator needs from the cluster manager.
pub trait ControlPlane {
    /// Stops each service, in the order given.
    fn stop(&self, services: &[Service]) -> Result<(), ControlPlaneError>;
    /// Starts each service, in the order given.
    fn start(&self, services: &[Service]) -> Result<(), ControlPlaneError>;
    /// Points each service at a new image reference.
    fn apply_image(&self, services: &[Service], image: &str) -> Result<(), ControlPlaneError>;
    /// Points the shell/management component at a new image reference.
    fn apply_shell_image(&self, image: &str) -> Result<(), ControlPlaneError>;
}

/// Cluster manager connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlPlaneConfig {
    /// Base URL of the cluster manager API.
    pub endpoint: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

/// HTTP implementation of [`ControlPlane`] over the cluster manager API.
pub struct HttpControlPlane {
    endpoint: String,
    client: Client,
}

impl HttpControlPlane {
    /// Builds a client from config.
    pub fn new(config: &ControlPlaneConfig) -> Result<Self, ControlPlaneError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn post(
        &self,
        operation: &'static str,
        target: &str,
        path: &str,
        body: serde_json::Value,
    ) -> Result<(), ControlPlaneError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.endpoint))
            .json(&body)
            .send()?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ControlPlaneError::Rejected {
                operation,
                target: target.to_string(),
                status: response.status().as_u16(),
            })
        }
    }
}

impl ControlPlane for HttpControlPlane {
    fn stop(&self, services: &[Service]) -> Result<(), ControlPlaneError> {
        for service in services {
            info!(service = service.name, "stopping service");
            self.post(
                "stop",
                service.name,
                &format!("services/{}/stop", service.name),
                json!({}),
            )?;
        }
        Ok(())
    }

    fn start(&self, services: &[Service]) -> Result<(), ControlPlaneError> {
        for service in services {
            info!(service = service.name, "starting service");
            self.post(
                "start",
                service.name,
                &format!("services/{}/start", service.name),
                json!({}),
            )?;
        }
        Ok(())
    }

    fn apply_image(&self, services: &[Service], image: &str) -> Result<(), ControlPlaneError> {
        for service in services {
            info!(service = service.name, image, "applying image");
            self.post(
                "apply_image",
                service.name,
                &format!("services/{}/image", service.name),
                json!({ "image": image }),
            )?;
        }
        Ok(())
    }

    fn apply_shell_image(&self, image: &str) -> Result<(), ControlPlaneError> {
        info!(image, "applying shell image");
        self.post("apply_shell_image", "clustersh", "shell/image", json!({ "image": image }))
    }
}
