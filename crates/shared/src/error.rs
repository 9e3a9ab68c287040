//! Error bodies returned by the prediction backend.

use serde::{Deserialize, Serialize};

/// A single field-validation failure as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Validation(Vec<ValidationIssue>),
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: ErrorDetail,
}

impl ErrorBody {
    /// Parses a response body, returning `None` for anything that is not a
    /// recognized error shape.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    /// The display text carried by the body, if any.
    pub fn message(&self) -> Option<String> {
        match &self.detail {
            ErrorDetail::Validation(issues) if !issues.is_empty() => Some(
                issues
                    .iter()
                    .map(|issue| issue.msg.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            ErrorDetail::Validation(_) => None,
            ErrorDetail::Message(message) => Some(message.clone()),
        }
    }
}
