//! Client for the zkPass TransGate proof widget

use alloy_primitives::Address;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::WidgetError;
use crate::types::{AttestationRequest, AttestationResult};

/// The external widget that produces attestation results.
#[async_trait]
pub trait ProofWidget: Send + Sync {
    /// Whether the widget is installed and answering.
    async fn is_available(&self) -> bool;

    /// Run a verification task; suspends until the user finishes in the widget.
    async fn launch(
        &self,
        request: &AttestationRequest,
        recipient: Option<Address>,
    ) -> Result<AttestationResult, WidgetError>;
}

#[derive(Deserialize)]
struct StatusResponse {
    available: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LaunchPayload<'a> {
    app_id: &'a str,
    schema_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    recipient: Option<String>,
}

/// Talks to the widget through its local HTTP bridge.
///
/// Only the status check is bounded by `status_timeout`; a launch waits for
/// as long as the user stays in the widget.
pub struct TransgateBridge {
    endpoint: String,
    client: Client,
    status_timeout: Duration,
}

impl TransgateBridge {
    /// Create a bridge client for `endpoint`
    pub fn new(endpoint: &str, status_timeout: Duration) -> Result<Self, WidgetError> {
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: Client::builder().build()?,
            status_timeout,
        })
    }
}

#[async_trait]
impl ProofWidget for TransgateBridge {
    async fn is_available(&self) -> bool {
        let status_url = format!("{}/status", self.endpoint);

        match self
            .client
            .get(&status_url)
            .timeout(self.status_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response
                .json::<StatusResponse>()
                .await
                .map(|status| status.available)
                .unwrap_or(false),
            Ok(response) => {
                debug!("TransGate status returned {}", response.status());
                false
            }
            Err(e) => {
                debug!("TransGate not reachable at {}: {}", status_url, e);
                false
            }
        }
    }

    async fn launch(
        &self,
        request: &AttestationRequest,
        recipient: Option<Address>,
    ) -> Result<AttestationResult, WidgetError> {
        let payload = LaunchPayload {
            app_id: &request.app_id,
            schema_id: &request.schema_id,
            recipient: recipient.map(|r| r.to_string()),
        };

        info!("Launching TransGate for schema {}", request.schema_id);

        let response = self
            .client
            .post(format!("{}/launch", self.endpoint))
            .json(&payload)
            .send()
            .await?;

        match response.status().as_u16() {
            200..=299 => {}
            404 => return Err(WidgetError::NotInstalled),
            status => {
                let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
                return Err(WidgetError::Launch(format!("TransGate returned {}: {}", status, error_text)));
            }
        }

        let result: AttestationResult = response
            .json()
            .await
            .map_err(|e| WidgetError::Launch(format!("Malformed result: {}", e)))?;

        debug!("TransGate finished task {}", result.task_id);
        Ok(result)
    }
}
