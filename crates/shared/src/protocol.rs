use serde::{Deserialize, Serialize};

use crate::domain::MediaType;

/// Label the backend assigns to files it failed to classify inside a batch.
pub const ERROR_LABEL: &str = "Error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub filename: String,
    pub media_type: MediaType,
    pub predicted_label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High confidence",
            ConfidenceLevel::Medium => "Medium confidence",
            ConfidenceLevel::Low => "Low confidence",
        }
    }
}

impl PredictionResult {
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        match self.confidence_percent() {
            p if p > 80 => ConfidenceLevel::High,
            p if p > 50 => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        }
    }

    pub fn is_error(&self) -> bool {
        self.predicted_label == ERROR_LABEL && self.confidence == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    pub results: Vec<PredictionResult>,
    pub total_processed: usize,
    pub success_count: usize,
    pub error_count: usize,
}

impl BatchPredictionResponse {
    /// Checks the counters against each other and against the number of
    /// files that were submitted.
    pub fn is_consistent_with(&self, submitted: usize) -> bool {
        self.success_count.checked_add(self.error_count) == Some(self.total_processed)
            && self.total_processed == submitted
    }

    pub fn failed(&self) -> impl Iterator<Item = &PredictionResult> {
        self.results.iter().filter(|result| result.is_error())
    }
}
