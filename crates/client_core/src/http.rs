use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ArticleInput, ClassificationResult, ModelInfo},
    error::ApiErrorBody,
    protocol::{ClassifyRequest, HealthStatus, TrainAcknowledgement, TrainRequest},
};
use tracing::{debug, warn};

use crate::{config::ClientSettings, error::ServiceError, ClassificationService};

pub struct HttpClassificationService {
    http: Client,
    server_url: String,
    request_timeout: Duration,
    train_timeout: Duration,
}

impl HttpClassificationService {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::from_settings(&ClientSettings {
            service_url: server_url.into(),
            ..ClientSettings::default()
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            http: Client::new(),
            server_url: settings.service_url.trim_end_matches('/').to_string(),
            request_timeout: settings.request_timeout(),
            train_timeout: settings.train_timeout(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub async fn health(&self) -> Result<HealthStatus, ServiceError> {
        let request = self
            .http
            .get(format!("{}/health", self.server_url))
            .timeout(self.request_timeout);
        self.send("health", request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = request
            .send()
            .await
            .map_err(|err| ServiceError::from_transport(operation, err))?;
        let status = response.status();
        debug!(operation, status = status.as_u16(), "service responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string()
            });
            warn!(operation, status = status.as_u16(), %message, "service rejected request");
            return Err(ServiceError::status(status.as_u16(), message));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| ServiceError::from_transport(operation, err))?;
        serde_json::from_slice(&body).map_err(|err| {
            ServiceError::malformed(format!("{operation} response was malformed: {err}"))
        })
    }
}

fn error_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => Some(parsed.message()),
        Err(_) => Some(body.trim().to_string()),
    }
}

#[async_trait]
impl ClassificationService for HttpClassificationService {
    async fn classify(
        &self,
        article: &ArticleInput,
    ) -> Result<ClassificationResult, ServiceError> {
        let request = self
            .http
            .post(format!("{}/classify", self.server_url))
            .timeout(self.request_timeout)
            .json(&ClassifyRequest::from(article));
        self.send("classify", request).await
    }

    async fn model_info(&self) -> Result<ModelInfo, ServiceError> {
        let request = self
            .http
            .get(format!("{}/model-info", self.server_url))
            .timeout(self.request_timeout);
        self.send("model-info", request).await
    }

    async fn retrain(&self) -> Result<TrainAcknowledgement, ServiceError> {
        let request = self
            .http
            .post(format!("{}/train", self.server_url))
            .timeout(self.train_timeout)
            .json(&TrainRequest::retrain());
        self.send("train", request).await
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
