use super::Scorer;
use crate::error::{LeadError, Result};
use crate::models::FeatureVector;
use crate::utils::parse_percent;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Scorer backed by the prediction service (`POST /nasabah/`).
pub struct HttpScorer {
    client: HttpClient,
    base_url: String,
}

impl HttpScorer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LeadError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn predict_url(&self) -> String {
        format!("{}/nasabah/", self.base_url)
    }
}

#[derive(Deserialize)]
struct PredictEnvelope {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<PredictData>,
}

#[derive(Deserialize)]
struct PredictData {
    predicted: serde_json::Value,
}

/// The service answers with either a number or a percent string.
fn predicted_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_percent(s),
        _ => None,
    }
}

fn parse_envelope(envelope: PredictEnvelope) -> Result<f64> {
    if envelope.status != "success" {
        return Err(LeadError::ScoringService(format!(
            "Scorer rejected request: {}",
            envelope.message.unwrap_or(envelope.status)
        )));
    }

    envelope
        .data
        .as_ref()
        .and_then(|d| predicted_value(&d.predicted))
        .ok_or_else(|| LeadError::ScoringService("Scorer response missing prediction".to_string()))
}

#[async_trait]
impl Scorer for HttpScorer {
    async fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let response = self
            .client
            .post(self.predict_url())
            .json(features)
            .send()
            .await
            .map_err(|e| LeadError::ScoringService(format!("Scorer request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LeadError::ScoringService(format!(
                "Scorer returned {}: {}",
                status, error_text
            )));
        }

        let envelope: PredictEnvelope = response
            .json()
            .await
            .map_err(|e| LeadError::ScoringService(format!("Parse error: {}", e)))?;

        let predicted = parse_envelope(envelope)?;
        debug!(predicted, "Scorer prediction received");
        Ok(predicted)
    }
}
