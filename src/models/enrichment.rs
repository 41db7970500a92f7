use serde::{Deserialize, Serialize};

/// AI-generated annotations attached to a note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    /// Short summary of the note.
    #[serde(default)]
    pub summary: String,
    /// Related topic tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Verbatim transcription for voice and image notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
}

impl Enrichment {
    /// Creates an enrichment with a summary and tags.
    pub fn new(summary: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            summary: summary.into(),
            tags,
            transcription: None,
        }
    }

    /// Sets the transcription.
    pub fn with_transcription(mut self, transcription: impl Into<String>) -> Self {
        self.transcription = Some(transcription.into());
        self
    }

    /// Returns the text best describing the note's meaning, for embedding.
    ///
    /// Prefers the transcription, then the summary.
    pub fn semantic_text(&self) -> Option<&str> {
        self.transcription
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| Some(self.summary.as_str()).filter(|s| !s.trim().is_empty()))
    }
}
