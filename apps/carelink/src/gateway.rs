//! # Prediction Gateway
//!
//! HTTP client for the external condition classifier.
//!
//! [`PredictionGateway::predict`] never fails: when the classifier is not
//! configured, unreachable, slow, answers non-2xx or sends something that is
//! not a valid ranking, the caller gets the fixed fallback list and the cause
//! is logged.

use crate::config::PredictionConfig;
use carelink_core::{ConditionItem, PredictionRequest, PredictionResponse, fallback_predictions};
use std::time::Duration;

// =============================================================================
// ERRORS
// =============================================================================

/// Why a classifier call did not produce a ranking.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("prediction service not configured")]
    NotConfigured,

    #[error("prediction service timed out after {0:?}")]
    Timeout(Duration),

    #[error("cannot reach prediction service: {0}")]
    Connection(String),

    #[error("prediction service returned HTTP {0}")]
    Status(u16),

    #[error("unreadable prediction response: {0}")]
    Body(String),

    #[error("invalid prediction response: {0}")]
    Invalid(String),
}

// =============================================================================
// GATEWAY
// =============================================================================

/// Client for `POST {base_url}/predict`.
#[derive(Debug, Clone)]
pub struct PredictionGateway {
    http: reqwest::Client,
    base_url: Option<String>,
    timeout: Duration,
}

impl PredictionGateway {
    /// `base_url` of `None` means every prediction uses the fallback list.
    #[must_use]
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &PredictionConfig) -> Self {
        Self::new(config.url.clone(), config.timeout())
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Ranked conditions for `request`, or the fallback list.
    pub async fn predict(&self, request: &PredictionRequest) -> Vec<ConditionItem> {
        match self.try_predict(request).await {
            Ok(ranked) => ranked,
            Err(GatewayError::NotConfigured) => {
                tracing::debug!("No prediction service configured, using fallback");
                fallback_predictions()
            }
            Err(e) => {
                tracing::warn!(
                    event = "prediction_fallback",
                    reason = %e,
                    "Prediction service failed, using fallback"
                );
                fallback_predictions()
            }
        }
    }

    /// One classifier call, bounded by the configured timeout.
    pub async fn try_predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<Vec<ConditionItem>, GatewayError> {
        let base = self.base_url.as_deref().ok_or(GatewayError::NotConfigured)?;
        let url = format!("{base}/predict");

        let call = async {
            let response = self
                .http
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| GatewayError::Connection(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(GatewayError::Status(status.as_u16()));
            }

            response
                .json::<PredictionResponse>()
                .await
                .map_err(|e| GatewayError::Body(e.to_string()))
        };

        let body = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))??;

        body.into_ranked()
            .map_err(|e| GatewayError::Invalid(e.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{addr}")
    }

    fn request() -> PredictionRequest {
        PredictionRequest::new(vec!["fever".to_string(), "cough".to_string()], None)
            .expect("request")
    }

    #[tokio::test]
    async fn ranks_classifier_answer() {
        let router = Router::new().route(
            "/predict",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["symptoms"], json!(["fever", "cough"]));
                Json(json!({"predictions": [
                    {"name": "Allergies", "probability": 0.1},
                    {"name": "Influenza", "probability": 0.8, "recommendConsultation": true},
                ]}))
            }),
        );
        let gateway = PredictionGateway::new(Some(spawn(router).await), Duration::from_secs(5));

        let ranked = gateway.try_predict(&request()).await.expect("predict");

        assert_eq!(ranked[0].name, "Influenza");
        assert!(ranked[0].recommend_consultation);
        assert_eq!(ranked[1].name, "Allergies");
        assert!(!ranked[1].recommend_consultation);
    }

    #[tokio::test]
    async fn server_error_falls_back() {
        let router = Router::new().route("/predict", post(|| async { StatusCode::BAD_GATEWAY }));
        let gateway = PredictionGateway::new(Some(spawn(router).await), Duration::from_secs(5));

        assert!(matches!(
            gateway.try_predict(&request()).await,
            Err(GatewayError::Status(502))
        ));
        assert_eq!(gateway.predict(&request()).await, fallback_predictions());
    }

    #[tokio::test]
    async fn slow_classifier_times_out() {
        let router = Router::new().route(
            "/predict",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({"predictions": []}))
            }),
        );
        let gateway = PredictionGateway::new(Some(spawn(router).await), Duration::from_millis(50));

        assert!(matches!(
            gateway.try_predict(&request()).await,
            Err(GatewayError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn out_of_range_probability_is_invalid() {
        let router = Router::new().route(
            "/predict",
            post(|| async { Json(json!({"predictions": [{"name": "X", "probability": 1.5}]})) }),
        );
        let gateway = PredictionGateway::new(Some(spawn(router).await), Duration::from_secs(5));

        assert!(matches!(
            gateway.try_predict(&request()).await,
            Err(GatewayError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn unconfigured_uses_fallback() {
        let gateway = PredictionGateway::new(None, Duration::from_secs(1));
        assert!(!gateway.is_configured());
        assert_eq!(gateway.predict(&request()).await, fallback_predictions());
    }
}
