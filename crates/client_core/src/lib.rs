use async_trait::async_trait;
use shared::{
    domain::{ArticleInput, ClassificationResult, ModelInfo},
    protocol::TrainAcknowledgement,
};

pub mod classification;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod http;
pub mod view;

pub use classification::{
    ClassificationController, ClassificationPhase, ClassificationState, SubmitOutcome,
};
pub use config::{load_settings, ClientSettings};
pub use dashboard::{
    DashboardState, FetchOutcome, LoadPhase, ModelDashboardController, RetrainOutcome,
    RetrainPhase,
};
pub use error::{ServiceError, ServiceErrorKind, ValidationError};
pub use http::HttpClassificationService;

#[async_trait]
pub trait ClassificationService: Send + Sync {
    /// `article` is already trimmed and complete.
    async fn classify(&self, article: &ArticleInput)
        -> Result<ClassificationResult, ServiceError>;
    async fn model_info(&self) -> Result<ModelInfo, ServiceError>;
    async fn retrain(&self) -> Result<TrainAcknowledgement, ServiceError>;
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
