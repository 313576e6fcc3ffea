use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{AnalysisError, AnalysisRequest, AnalysisResult, AnalysisService};

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8080";
pub const DEFAULT_ANALYZE_PATH: &str = "/analyze";

/// Talks to the analysis backend over HTTP: `POST {base}{path}` with a JSON
/// `AnalysisRequest`, expecting an `AnalysisResult` or `{"error": "..."}` back.
#[derive(Clone)]
pub struct HttpAnalysisService {
    client: Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ServiceReply {
    Failed { error: String },
    Analyzed(AnalysisResult),
}

impl HttpAnalysisService {
    pub fn new(base_url: &str, path: &str) -> Self {
        Self::with_client(Client::new(), base_url, path)
    }

    /// Timeouts are enforced by the orchestrator, so the default client carries none.
    pub fn with_client(client: Client, base_url: &str, path: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), path),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        debug!("POST {} ({} bytes, {})", self.endpoint, request.source_text.len(), request.language);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error);
            return Err(AnalysisError::Service {
                status: status.to_string(),
                message,
            });
        }

        match serde_json::from_slice::<ServiceReply>(&body) {
            Ok(ServiceReply::Analyzed(result)) => Ok(result),
            // Some deployments answer 200 with an application-level error
            Ok(ServiceReply::Failed { error }) => Err(AnalysisError::Service {
                status: status.to_string(),
                message: Some(error),
            }),
            Err(e) => Err(AnalysisError::Malformed(e.to_string())),
        }
    }
}
