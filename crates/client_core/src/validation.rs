//! Client-side checks applied to a selection before anything is submitted.

use std::fmt;

use shared::domain::{Arity, MediaType, Mode};

use crate::{config::Settings, upload::UploadFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimits {
    pub max_bytes: u64,
    pub max_files: usize,
}

impl SelectionLimits {
    pub fn for_mode(mode: Mode, settings: &Settings) -> Self {
        let max_files = match mode.arity() {
            Arity::Single => 1,
            Arity::Batch => settings.batch_max_files,
        };
        Self {
            max_bytes: settings.max_bytes(mode),
            max_files,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    UnsupportedType { media: MediaType },
    TooLarge { size_bytes: u64, max_bytes: u64 },
    TooManyFiles { count: usize, max_files: usize },
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// `None` when the whole selection was refused rather than a single file.
    pub filename: Option<String>,
    pub reason: RejectionReason,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.filename.as_deref().unwrap_or("selection");
        match &self.reason {
            RejectionReason::UnsupportedType { media } => write!(
                f,
                "{name} is not a supported {media} file (accepted: {})",
                media
                    .accepted_extensions()
                    .iter()
                    .map(|ext| format!(".{ext}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            RejectionReason::TooLarge { size_bytes, max_bytes } => write!(
                f,
                "{name} is {} but the limit is {}",
                format_megabytes(*size_bytes),
                format_megabytes(*max_bytes)
            ),
            RejectionReason::TooManyFiles { count, max_files } => write!(
                f,
                "{count} files selected but at most {max_files} can be processed at once"
            ),
            RejectionReason::Empty => write!(f, "no files selected"),
        }
    }
}

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

#[derive(Debug, Default)]
pub struct ValidatedSelection {
    pub accepted: Vec<UploadFile>,
    pub rejected: Vec<Rejection>,
}

/// Splits `files` into the ones that may be submitted for `media` and the ones
/// that must be refused. Exceeding the file count refuses everything.
pub fn validate_selection(
    files: Vec<UploadFile>,
    media: MediaType,
    limits: SelectionLimits,
) -> ValidatedSelection {
    if files.is_empty() {
        return ValidatedSelection {
            accepted: Vec::new(),
            rejected: vec![Rejection {
                filename: None,
                reason: RejectionReason::Empty,
            }],
        };
    }

    if files.len() > limits.max_files {
        return ValidatedSelection {
            accepted: Vec::new(),
            rejected: vec![Rejection {
                filename: None,
                reason: RejectionReason::TooManyFiles {
                    count: files.len(),
                    max_files: limits.max_files,
                },
            }],
        };
    }

    let mut selection = ValidatedSelection::default();
    for file in files {
        let extension_ok = file
            .extension()
            .is_some_and(|ext| media.accepted_extensions().contains(&ext.as_str()));
        let reason = if !extension_ok {
            Some(RejectionReason::UnsupportedType { media })
        } else if file.size() > limits.max_bytes {
            Some(RejectionReason::TooLarge {
                size_bytes: file.size(),
                max_bytes: limits.max_bytes,
            })
        } else {
            None
        };

        match reason {
            Some(reason) => selection.rejected.push(Rejection {
                filename: Some(file.filename.clone()),
                reason,
            }),
            None => selection.accepted.push(file),
        }
    }
    selection
}
