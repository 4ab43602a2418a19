use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::{
    domain::{ArticleInput, ClassificationResult, ModelInfo, ModelMetrics, Prediction},
    protocol::TrainAcknowledgement,
};
use tokio::sync::Semaphore;

use crate::{error::ServiceError, ClassificationService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Classify,
    ModelInfo,
    Retrain,
}

#[derive(Default)]
pub struct StubService {
    classify_responses: Mutex<VecDeque<Result<ClassificationResult, ServiceError>>>,
    model_info_responses: Mutex<VecDeque<Result<ModelInfo, ServiceError>>>,
    retrain_responses: Mutex<VecDeque<Result<TrainAcknowledgement, ServiceError>>>,
    calls: Mutex<Vec<Call>>,
    classified: Mutex<Vec<ArticleInput>>,
    gate: Option<Arc<Semaphore>>,
}

impl StubService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call waits for a permit on the returned semaphore before answering.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn with_classify(self, response: Result<ClassificationResult, ServiceError>) -> Self {
        self.classify_responses
            .lock()
            .expect("stub lock")
            .push_back(response);
        self
    }

    pub fn with_model_info(self, response: Result<ModelInfo, ServiceError>) -> Self {
        self.model_info_responses
            .lock()
            .expect("stub lock")
            .push_back(response);
        self
    }

    pub fn with_retrain(self, response: Result<TrainAcknowledgement, ServiceError>) -> Self {
        self.retrain_responses
            .lock()
            .expect("stub lock")
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("stub lock").clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().into_iter().filter(|made| *made == call).count()
    }

    pub fn classified(&self) -> Vec<ArticleInput> {
        self.classified.lock().expect("stub lock").clone()
    }

    async fn enter(&self, call: Call) {
        self.calls.lock().expect("stub lock").push(call);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate open").forget();
        }
    }

    fn next<T>(queue: &Mutex<VecDeque<Result<T, ServiceError>>>) -> Result<T, ServiceError> {
        queue
            .lock()
            .expect("stub lock")
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::status(500, "no stubbed response")))
    }
}

#[async_trait]
impl ClassificationService for StubService {
    async fn classify(
        &self,
        article: &ArticleInput,
    ) -> Result<ClassificationResult, ServiceError> {
        self.classified
            .lock()
            .expect("stub lock")
            .push(article.clone());
        self.enter(Call::Classify).await;
        Self::next(&self.classify_responses)
    }

    async fn model_info(&self) -> Result<ModelInfo, ServiceError> {
        self.enter(Call::ModelInfo).await;
        Self::next(&self.model_info_responses)
    }

    async fn retrain(&self) -> Result<TrainAcknowledgement, ServiceError> {
        self.enter(Call::Retrain).await;
        Self::next(&self.retrain_responses)
    }
}

pub fn real_result() -> ClassificationResult {
    ClassificationResult {
        prediction: Prediction::Real,
        confidence: 0.92,
        probability_real: 0.92,
        probability_fake: 0.08,
        processed_text_length: 34,
        timestamp: Utc
            .with_ymd_and_hms(2024, 5, 2, 9, 30, 0)
            .single()
            .expect("valid timestamp"),
    }
}

pub fn model_info(test_accuracy: f64, training_samples: u64) -> ModelInfo {
    ModelInfo {
        model_type: Some("Logistic Regression with TF-IDF".to_string()),
        trained_at: None,
        metrics: ModelMetrics {
            test_accuracy: Some(test_accuracy),
            training_samples: Some(training_samples),
            ..ModelMetrics::default()
        },
        status: None,
    }
}

pub fn acknowledgement() -> TrainAcknowledgement {
    TrainAcknowledgement {
        message: Some("Model trained successfully".to_string()),
        ..TrainAcknowledgement::default()
    }
}
