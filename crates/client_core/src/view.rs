use chrono::{DateTime, Local, Utc};
use shared::domain::{ClassificationResult, ModelInfo, Prediction};

pub const NOT_AVAILABLE: &str = "N/A";

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(ratio) if ratio.is_finite() => format!("{:.1}%", ratio * 100.0),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_count(value: Option<u64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |count| count.to_string())
}

pub fn format_timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |instant| {
            instant
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    )
}

/// The service labels classes by index: `0` is fake, `1` is real.
pub fn class_label(key: &str) -> String {
    match key {
        "0" => "Fake News".to_string(),
        "1" => "Real News".to_string(),
        other => other.to_string(),
    }
}

pub fn prediction_label(prediction: Prediction) -> &'static str {
    match prediction {
        Prediction::Real => "REAL NEWS",
        Prediction::Fake => "FAKE NEWS",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub label: String,
    pub precision: String,
    pub recall: String,
    pub f1_score: String,
    pub support: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSummary {
    pub model_type: String,
    pub trained_at: String,
    pub train_accuracy: String,
    pub test_accuracy: String,
    pub training_samples: String,
    pub test_samples: String,
    pub features_count: String,
    pub report_rows: Vec<ReportRow>,
}

impl From<&ModelInfo> for MetricsSummary {
    fn from(info: &ModelInfo) -> Self {
        let metrics = &info.metrics;
        let report_rows = metrics
            .classification_report
            .iter()
            .flatten()
            .map(|(key, entry)| ReportRow {
                label: class_label(key),
                precision: format_percent(Some(entry.precision)),
                recall: format_percent(Some(entry.recall)),
                f1_score: format_percent(Some(entry.f1_score)),
                support: entry.support.to_string(),
            })
            .collect();

        Self {
            model_type: info
                .model_type
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            trained_at: format_timestamp(info.trained_at),
            train_accuracy: format_percent(metrics.train_accuracy),
            test_accuracy: format_percent(metrics.test_accuracy),
            training_samples: format_count(metrics.training_samples),
            test_samples: format_count(metrics.test_samples),
            features_count: format_count(metrics.features_count),
            report_rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSummary {
    pub prediction: String,
    pub confidence: String,
    pub probability_real: String,
    pub probability_fake: String,
    pub processed_text_length: String,
    pub classified_at: String,
}

impl From<&ClassificationResult> for ResultSummary {
    fn from(result: &ClassificationResult) -> Self {
        Self {
            prediction: prediction_label(result.prediction).to_string(),
            confidence: format_percent(Some(result.confidence)),
            probability_real: format_percent(Some(result.probability_real)),
            probability_fake: format_percent(Some(result.probability_fake)),
            processed_text_length: result.processed_text_length.to_string(),
            classified_at: format_timestamp(Some(result.timestamp)),
        }
    }
}
