use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Category of a note, used for styling graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteCategory {
    /// Typed text note.
    Text,
    /// Recorded audio note.
    Voice,
    /// Captured photo, typically of handwriting.
    Image,
}

impl NoteCategory {
    /// Returns the stored name of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for NoteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown note category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for NoteCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "voice" => Ok(Self::Voice),
            "image" => Ok(Self::Image),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// Category-specific payload of a note.
///
/// Each variant carries only the fields that make sense for its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NoteKind {
    Text,
    Voice {
        /// Path of the recorded audio file, if one was captured.
        audio_path: Option<PathBuf>,
    },
    Image {
        /// Path of the captured image file, if one was captured.
        image_path: Option<PathBuf>,
    },
}

impl NoteKind {
    /// Returns the category of this kind.
    pub fn category(&self) -> NoteCategory {
        match self {
            Self::Text => NoteCategory::Text,
            Self::Voice { .. } => NoteCategory::Voice,
            Self::Image { .. } => NoteCategory::Image,
        }
    }

    /// Builds a kind from a category and an optional media file.
    ///
    /// The media path is ignored for text notes.
    pub fn with_media(category: NoteCategory, media: Option<PathBuf>) -> Self {
        match category {
            NoteCategory::Text => Self::Text,
            NoteCategory::Voice => Self::Voice { audio_path: media },
            NoteCategory::Image => Self::Image { image_path: media },
        }
    }

    /// Returns the attached media file, if any.
    pub fn media_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Text => None,
            Self::Voice { audio_path } => audio_path.as_ref(),
            Self::Image { image_path } => image_path.as_ref(),
        }
    }
}
