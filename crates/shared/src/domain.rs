use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Audio,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Audio => "audio",
        }
    }

    /// Lowercase extensions (without the dot) accepted for this media type.
    pub fn accepted_extensions(self) -> &'static [&'static str] {
        match self {
            MediaType::Image => &["png", "jpg", "jpeg", "webp"],
            MediaType::Audio => &["wav", "mp3", "ogg"],
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    Single,
    Batch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Image,
    Audio,
    BatchImage,
    BatchAudio,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Image, Mode::Audio, Mode::BatchImage, Mode::BatchAudio];

    pub fn new(arity: Arity, media: MediaType) -> Self {
        match (arity, media) {
            (Arity::Single, MediaType::Image) => Mode::Image,
            (Arity::Single, MediaType::Audio) => Mode::Audio,
            (Arity::Batch, MediaType::Image) => Mode::BatchImage,
            (Arity::Batch, MediaType::Audio) => Mode::BatchAudio,
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Mode::Image | Mode::Audio => Arity::Single,
            Mode::BatchImage | Mode::BatchAudio => Arity::Batch,
        }
    }

    pub fn media(self) -> MediaType {
        match self {
            Mode::Image | Mode::BatchImage => MediaType::Image,
            Mode::Audio | Mode::BatchAudio => MediaType::Audio,
        }
    }

    pub fn is_batch(self) -> bool {
        self.arity() == Arity::Batch
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Image => "image",
            Mode::Audio => "audio",
            Mode::BatchImage => "batch-image",
            Mode::BatchAudio => "batch-audio",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown mode '{0}', expected one of: image, audio, batch-image, batch-audio")]
pub struct ParseModeError(pub String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Mode::Image),
            "audio" => Ok(Mode::Audio),
            "batch-image" | "batch_image" => Ok(Mode::BatchImage),
            "batch-audio" | "batch_audio" => Ok(Mode::BatchAudio),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}
