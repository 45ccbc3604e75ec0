//! API client for a running insights server

use anyhow::{Context, Result};
use insights_lib::RawTelemetry;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the insights server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Insights over the server's stored telemetry
    pub async fn stored_insights(&self) -> Result<InsightsResponse> {
        let url = self.base_url.join("insights").context("Invalid path")?;
        self.insights(self.client.get(url)).await
    }

    /// Insights over locally supplied telemetry
    pub async fn submit_insights(&self, telemetry: &RawTelemetry) -> Result<InsightsResponse> {
        let url = self.base_url.join("insights").context("Invalid path")?;
        self.insights(self.client.post(url).json(telemetry)).await
    }

    /// Failed reports arrive as HTTP 500 with a diagnostic body, so the body
    /// is parsed whenever it has the insights shape.
    async fn insights(&self, request: RequestBuilder) -> Result<InsightsResponse> {
        let response = request.send().await.context("Failed to send request")?;
        let status = response.status();
        let body = response.text().await.context("Failed to read response")?;

        match serde_json::from_str::<InsightsBody>(&body) {
            Ok(parsed) => Ok(InsightsResponse {
                insights: parsed.insights,
                failed: !status.is_success(),
            }),
            Err(_) if !status.is_success() => anyhow::bail!("API error ({}): {}", status, body),
            Err(e) => Err(e).context("Failed to parse response"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InsightsBody {
    insights: Vec<String>,
}

/// Insight list returned by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsResponse {
    pub insights: Vec<String>,
    /// Set when the server reported a diagnostic instead of a result
    #[serde(default)]
    pub failed: bool,
}

/// Server health, as returned by `/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    pub model_loaded: bool,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<String>,
}
