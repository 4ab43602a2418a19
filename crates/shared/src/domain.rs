use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{error::UnknownExampleKind, lenient};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleInput {
    pub title: String,
    pub content: String,
}

impl ArticleInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }

    pub fn trimmed(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    Real,
    Fake,
}

impl Prediction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::Fake => "fake",
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub prediction: Prediction,
    pub confidence: f64,
    pub probability_real: f64,
    pub probability_fake: f64,
    pub processed_text_length: u64,
    #[serde(deserialize_with = "lenient::required_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl ClassificationResult {
    pub fn probabilities_sum_to_one(&self, tolerance: f64) -> bool {
        ((self.probability_real + self.probability_fake) - 1.0).abs() <= tolerance
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReportEntry {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score", alias = "f1_score")]
    pub f1_score: f64,
    #[serde(deserialize_with = "lenient::count")]
    pub support: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    #[serde(
        default,
        deserialize_with = "lenient::optional_ratio",
        skip_serializing_if = "Option::is_none"
    )]
    pub train_accuracy: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_ratio",
        skip_serializing_if = "Option::is_none"
    )]
    pub test_accuracy: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub training_samples: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub test_samples: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub features_count: Option<u64>,
    #[serde(
        default,
        deserialize_with = "class_report",
        skip_serializing_if = "Option::is_none"
    )]
    pub classification_report: Option<BTreeMap<String, ClassReportEntry>>,
}

/// Keeps only the per-class objects; scalar entries like `"accuracy": 0.87` are dropped.
fn class_report<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, ClassReportEntry>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::Object(raw)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let report = raw
        .into_iter()
        .filter(|(_, value)| value.get("precision").is_some())
        .filter_map(|(label, value)| {
            serde_json::from_value::<ClassReportEntry>(value)
                .ok()
                .map(|entry| (label, entry))
        })
        .collect();
    Ok(Some(report))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "metrics_or_default")]
    pub metrics: ModelMetrics,
    /// Set instead of the model fields when the service has nothing loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

fn metrics_or_default<'de, D>(deserializer: D) -> Result<ModelMetrics, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ModelMetrics>::deserialize(deserializer)?.unwrap_or_default())
}

impl ModelInfo {
    pub fn is_trained(&self) -> bool {
        self.model_type.is_some() || self.trained_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExampleKind {
    Real,
    Fake,
}

impl ExampleKind {
    pub fn article(self) -> &'static ExampleArticle {
        match self {
            Self::Real => &REAL_EXAMPLE,
            Self::Fake => &FAKE_EXAMPLE,
        }
    }
}

impl FromStr for ExampleKind {
    type Err = UnknownExampleKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "real" => Ok(Self::Real),
            "fake" => Ok(Self::Fake),
            _ => Err(UnknownExampleKind(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExampleArticle {
    pub kind: ExampleKind,
    pub title: &'static str,
    pub content: &'static str,
}

impl ExampleArticle {
    pub fn to_input(&self) -> ArticleInput {
        ArticleInput::new(self.title, self.content)
    }
}

pub const REAL_EXAMPLE: ExampleArticle = ExampleArticle {
    kind: ExampleKind::Real,
    title: "Federal Reserve Announces Interest Rate Decision",
    content: "The Federal Reserve announced a 0.25% interest rate increase following their \
              monthly meeting. The decision comes amid ongoing concerns about inflation and \
              economic stability. Fed Chair emphasized the importance of maintaining price \
              stability while supporting employment growth.",
};

pub const FAKE_EXAMPLE: ExampleArticle = ExampleArticle {
    kind: ExampleKind::Fake,
    title: "Scientists Discover Water Causes Cancer",
    content: "A shocking new study reveals that drinking water causes cancer in 99% of cases. \
              Researchers at a made-up university claim that H2O molecules directly attack \
              healthy cells. This groundbreaking discovery will change everything we know \
              about hydration.",
};
