//! Plain-text rendering of results and session state.

use std::fmt::Write as _;

use client_core::{
    session::SessionSnapshot, validation::format_megabytes, PreviewLocator, SessionState,
};
use shared::protocol::{BatchPredictionResponse, PredictionResult};

pub trait Render {
    fn render(&self) -> String;
}

impl Render for PredictionResult {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Prediction for {}", self.filename);
        let _ = writeln!(out, "  Identified instrument: {}", self.predicted_label);
        let _ = writeln!(
            out,
            "  Confidence: {}% ({}), score {:.4}",
            self.confidence_percent(),
            self.confidence_level().label(),
            self.confidence
        );
        out
    }
}

impl Render for BatchPredictionResponse {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Processed {} files: {} successful, {} errors.",
            self.total_processed, self.success_count, self.error_count
        );
        let failed: Vec<_> = self.failed().map(|result| result.filename.as_str()).collect();
        if !failed.is_empty() {
            let _ = writeln!(out, "  Failed: {}", failed.join(", "));
        }
        for (index, result) in self.results.iter().enumerate() {
            let marker = if result.is_error() {
                "!"
            } else if result.confidence > 0.8 {
                "+"
            } else {
                "~"
            };
            let _ = writeln!(
                out,
                "  {marker} [{index}] {:<32} {:<16} {:>5.1}%",
                result.filename,
                result.predicted_label,
                result.confidence * 100.0
            );
        }
        out
    }
}

pub fn render_snapshot<O: Render>(snapshot: &SessionSnapshot<O>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", snapshot.mode, snapshot.state.name());
    for (index, file) in snapshot.files.iter().enumerate() {
        let preview = snapshot
            .previews
            .get(index)
            .and_then(Option::as_ref)
            .map(|handle| match &handle.locator {
                PreviewLocator::Path(path) => path.display().to_string(),
                PreviewLocator::Memory(uri) => uri.clone(),
            })
            .unwrap_or_else(|| "no preview".to_string());
        let _ = writeln!(
            out,
            "  [{index}] {} ({}) -> {preview}",
            file.filename,
            format_megabytes(file.size_bytes)
        );
    }
    match &snapshot.state {
        SessionState::Success(output) => out.push_str(&output.render()),
        SessionState::Failed(message) => {
            let _ = writeln!(out, "  Failed: {message} (type 'retry' to resubmit)");
        }
        SessionState::Pending => out.push_str("  Waiting for the prediction service...\n"),
        SessionState::Idle | SessionState::Selected => {}
    }
    out
}
