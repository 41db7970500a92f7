//! AI enrichment of notes.
//!
//! [`NoteEnricher`] asks an [`AiClient`] for a summary and tags (plus a
//! transcription for image notes) and for an embedding of the note's meaning.
//! Failures are reported as [`EnrichmentOutcome::Failed`] so a batch can keep
//! going; nothing here writes to the store.

use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::ollama::AiClient;
use crate::{Embedding, Enrichment, Note, NoteKind};

const TEXT_PROMPT: &str = r#"Analyze the following note. Provide a concise summary and 3 related tags.

Return ONLY a JSON object: {"summary": string, "tags": string[]}

NOTE CONTENT:
{content}

JSON OUTPUT:"#;

const IMAGE_PROMPT: &str = r#"Analyze this image. If it contains handwritten text, transcribe it fully. Then provide a summary and 3 key tags.

Return ONLY a JSON object: {"transcription": string, "summary": string, "tags": string[]}

{caption}JSON OUTPUT:"#;

const VOICE_PROMPT: &str = r#"The following is the transcript of a voice memo. Provide a concise summary and 3 related tags.

Return ONLY a JSON object: {"summary": string, "tags": string[]}

TRANSCRIPT:
{content}

JSON OUTPUT:"#;

/// Result of enriching one note.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    /// The model produced annotations. `embedding` is `None` when only the
    /// embedding request failed.
    Enriched {
        enrichment: Enrichment,
        embedding: Option<Embedding>,
    },
    /// The note could not be enriched.
    Failed { reason: String },
}

impl EnrichmentOutcome {
    fn failed(reason: impl Into<String>) -> Self {
        EnrichmentOutcome::Failed {
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`EnrichmentOutcome::Enriched`].
    pub fn is_enriched(&self) -> bool {
        matches!(self, EnrichmentOutcome::Enriched { .. })
    }
}

/// Annotations as the model returns them.
#[derive(Debug, Deserialize)]
struct ModelReply {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    transcription: Option<String>,
}

/// Enriches notes using an AI backend.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use umbra::enricher::{EnrichmentOutcome, NoteEnricher};
/// use umbra::ollama::OllamaClientBuilder;
/// use umbra::{NoteBuilder, NoteId};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = OllamaClientBuilder::new().build()?;
/// let (model, embed_model) = (client.model().to_string(), client.embed_model().to_string());
/// let enricher = NoteEnricher::new(Arc::new(client), model, embed_model);
///
/// let note = NoteBuilder::new().id(NoteId::new("n1")).content("rust ownership").build();
/// if let EnrichmentOutcome::Enriched { enrichment, .. } = enricher.enrich(&note) {
///     println!("{}", enrichment.summary);
/// }
/// # Ok(())
/// # }
/// ```
pub struct NoteEnricher {
    client: Arc<dyn AiClient>,
    model: String,
    embed_model: String,
}

impl NoteEnricher {
    /// Creates an enricher using `model` for generation and `embed_model` for
    /// embeddings.
    #[must_use]
    pub fn new(
        client: Arc<dyn AiClient>,
        model: impl Into<String>,
        embed_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            embed_model: embed_model.into(),
        }
    }

    /// Enriches a single note.
    pub fn enrich(&self, note: &Note) -> EnrichmentOutcome {
        let result = match note.kind() {
            NoteKind::Text => self.enrich_text(note.content()),
            NoteKind::Image { image_path } => match image_path {
                Some(path) => self.enrich_image(path, note.content()),
                None => return EnrichmentOutcome::failed("image note has no image file"),
            },
            NoteKind::Voice { .. } => {
                if note.content().trim().is_empty() {
                    return EnrichmentOutcome::failed(
                        "voice note has no transcript; re-add it with the transcript as content",
                    );
                }
                self.enrich_voice(note.content())
            }
        };

        let enrichment = match result {
            Ok(enrichment) => enrichment,
            Err(reason) => {
                warn!(note = %note.id(), %reason, "enrichment failed");
                return EnrichmentOutcome::Failed { reason };
            }
        };

        let embedding = self.embedding_for(note, &enrichment);
        debug!(
            note = %note.id(),
            tags = enrichment.tags.len(),
            embedded = embedding.is_some(),
            "note enriched"
        );
        EnrichmentOutcome::Enriched {
            enrichment,
            embedding,
        }
    }

    fn enrich_text(&self, content: &str) -> Result<Enrichment, String> {
        let prompt = TEXT_PROMPT.replace("{content}", content);
        let reply = self.generate(&prompt, &[])?;
        Ok(parse_reply(&reply))
    }

    fn enrich_voice(&self, transcript: &str) -> Result<Enrichment, String> {
        let prompt = VOICE_PROMPT.replace("{content}", transcript);
        let reply = self.generate(&prompt, &[])?;
        Ok(parse_reply(&reply).with_transcription(transcript))
    }

    fn enrich_image(&self, path: &Path, caption: &str) -> Result<Enrichment, String> {
        let image = encode_image(path)?;
        let caption = match caption.trim() {
            "" => String::new(),
            text => format!("USER CAPTION:\n{text}\n\n"),
        };
        let prompt = IMAGE_PROMPT.replace("{caption}", &caption);
        let reply = self.generate(&prompt, &[image])?;
        Ok(parse_reply(&reply))
    }

    fn generate(&self, prompt: &str, images: &[String]) -> Result<String, String> {
        self.client
            .generate(&self.model, prompt, images)
            .map_err(|e| e.to_string())
    }

    /// Embeds the note's content, or its transcription/summary for media
    /// notes. An embedding failure does not fail the enrichment.
    fn embedding_for(&self, note: &Note, enrichment: &Enrichment) -> Option<Embedding> {
        let text = match note.kind() {
            NoteKind::Text => Some(note.content()),
            _ => enrichment.semantic_text(),
        }?;

        match self.client.embed(&self.embed_model, text) {
            Ok(values) => {
                let embedding = Embedding::from_values(values);
                if embedding.is_none() {
                    warn!(note = %note.id(), "embedding contained non-finite values");
                }
                embedding
            }
            Err(e) => {
                warn!(note = %note.id(), error = %e, "embedding request failed");
                None
            }
        }
    }
}

/// Reads an image file and encodes it as standard base64.
fn encode_image(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("cannot read image {}: {}", path.display(), e))?;
    Ok(STANDARD.encode(bytes))
}

/// Extracts the JSON object from a model response.
///
/// Takes everything between the first `{` and the last `}`, which handles
/// markdown code fences and explanatory text around the object.
fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (start <= end).then(|| &response[start..=end])
}

/// Turns a model reply into an enrichment.
///
/// Replies without a parseable JSON object become the summary verbatim.
fn parse_reply(reply: &str) -> Enrichment {
    let parsed = extract_json(reply).and_then(|json| match serde_json::from_str::<ModelReply>(json) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(error = %e, "model reply is not the expected JSON");
            None
        }
    });

    let Some(parsed) = parsed else {
        return Enrichment::new(reply.trim(), Vec::new());
    };

    let tags = parsed
        .tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let enrichment = Enrichment::new(parsed.summary.trim(), tags);
    match parsed.transcription.filter(|t| !t.trim().is_empty()) {
        Some(transcription) => enrichment.with_transcription(transcription),
        None => enrichment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ollama::AiError;
    use crate::{NoteBuilder, NoteId};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Records calls and replays canned responses.
    struct MockClient {
        reply: Result<String, u16>,
        embedding: Result<Vec<f64>, u16>,
        prompts: Mutex<Vec<(String, Vec<String>)>>,
        embedded: Mutex<Vec<String>>,
    }

    impl MockClient {
        fn new(reply: &str, embedding: Vec<f64>) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                embedding: Ok(embedding),
                prompts: Mutex::new(Vec::new()),
                embedded: Mutex::new(Vec::new()),
            }
        }
    }

    impl AiClient for MockClient {
        fn generate(
            &self,
            _model: &str,
            prompt: &str,
            images: &[String],
        ) -> Result<String, AiError> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), images.to_vec()));
            self.reply
                .clone()
                .map_err(|status| AiError::Http { status })
        }

        fn embed(&self, _model: &str, text: &str) -> Result<Vec<f64>, AiError> {
            self.embedded.lock().unwrap().push(text.to_string());
            self.embedding
                .clone()
                .map_err(|status| AiError::Http { status })
        }
    }

    fn note(content: &str, kind: NoteKind) -> Note {
        NoteBuilder::new()
            .id(NoteId::new("n1"))
            .content(content)
            .kind(kind)
            .build()
    }

    fn enricher(client: &Arc<MockClient>) -> NoteEnricher {
        NoteEnricher::new(client.clone(), "gen", "embed")
    }

    #[test]
    fn text_note_gets_summary_tags_and_content_embedding() {
        let client = Arc::new(MockClient::new(
            r#"{"summary": "About ownership", "tags": ["rust", " memory ", ""]}"#,
            vec![0.1, 0.2],
        ));

        let outcome = enricher(&client).enrich(&note("rust ownership rules", NoteKind::Text));

        let EnrichmentOutcome::Enriched {
            enrichment,
            embedding,
        } = outcome
        else {
            panic!("expected enrichment");
        };
        assert_eq!(enrichment.summary, "About ownership");
        assert_eq!(enrichment.tags, vec!["rust", "memory"]);
        assert_eq!(embedding.unwrap().values(), &[0.1, 0.2]);
        assert_eq!(*client.embedded.lock().unwrap(), vec!["rust ownership rules"]);
        assert!(client.prompts.lock().unwrap()[0].0.contains("rust ownership rules"));
    }

    #[test]
    fn unstructured_reply_becomes_summary() {
        let client = Arc::new(MockClient::new("  Just a plain sentence.  ", vec![1.0]));

        let outcome = enricher(&client).enrich(&note("x", NoteKind::Text));

        match outcome {
            EnrichmentOutcome::Enriched { enrichment, .. } => {
                assert_eq!(enrichment.summary, "Just a plain sentence.");
                assert!(enrichment.tags.is_empty());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn parse_reply_handles_code_fences_and_preamble() {
        let reply = "Here you go:\n```json\n{\"summary\": \"s\", \"tags\": [\"a\"]}\n```\nDone.";

        let enrichment = parse_reply(reply);

        assert_eq!(enrichment.summary, "s");
        assert_eq!(enrichment.tags, vec!["a"]);
    }

    #[test]
    fn parse_reply_falls_back_on_malformed_json() {
        let reply = "{summary: oops}";
        assert_eq!(parse_reply(reply).summary, "{summary: oops}");
    }

    #[test]
    fn extract_json_handles_nested_objects() {
        let reply = r#"prefix {"a": {"b": 1}} suffix"#;
        assert_eq!(extract_json(reply), Some(r#"{"a": {"b": 1}}"#));
        assert_eq!(extract_json("} backwards {"), None);
        assert_eq!(extract_json("no braces"), None);
    }

    #[test]
    fn generation_error_is_reported_as_failure() {
        let client = Arc::new(MockClient {
            reply: Err(500),
            ..MockClient::new("", vec![])
        });

        let outcome = enricher(&client).enrich(&note("content", NoteKind::Text));

        match outcome {
            EnrichmentOutcome::Failed { reason } => assert!(reason.contains("500")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(client.embedded.lock().unwrap().is_empty());
    }

    #[test]
    fn embedding_error_keeps_enrichment() {
        let client = Arc::new(MockClient {
            embedding: Err(503),
            ..MockClient::new(r#"{"summary": "s", "tags": []}"#, vec![])
        });

        let outcome = enricher(&client).enrich(&note("content", NoteKind::Text));

        assert_eq!(
            outcome,
            EnrichmentOutcome::Enriched {
                enrichment: Enrichment::new("s", vec![]),
                embedding: None,
            }
        );
    }

    #[test]
    fn voice_note_without_transcript_fails_without_calling_model() {
        let client = Arc::new(MockClient::new("{}", vec![1.0]));

        let outcome = enricher(&client).enrich(&note(
            " ",
            NoteKind::Voice {
                audio_path: Some(PathBuf::from("memo.m4a")),
            },
        ));

        match outcome {
            EnrichmentOutcome::Failed { reason } => {
                assert!(reason.contains("no transcript"));
                assert!(reason.contains("transcript as content"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn voice_note_keeps_transcript_and_embeds_it() {
        let client = Arc::new(MockClient::new(
            r#"{"summary": "Plumbing", "tags": ["home"]}"#,
            vec![0.5],
        ));

        let outcome = enricher(&client).enrich(&note(
            "call the plumber tomorrow",
            NoteKind::Voice { audio_path: None },
        ));

        let EnrichmentOutcome::Enriched { enrichment, .. } = outcome else {
            panic!("expected enrichment");
        };
        assert_eq!(
            enrichment.transcription.as_deref(),
            Some("call the plumber tomorrow")
        );
        assert_eq!(
            *client.embedded.lock().unwrap(),
            vec!["call the plumber tomorrow"]
        );
    }

    #[test]
    fn image_note_sends_base64_and_embeds_transcription() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hi").unwrap();
        let client = Arc::new(MockClient::new(
            r#"{"transcription": "buy eggs", "summary": "Shopping list", "tags": ["errands"]}"#,
            vec![0.3, 0.4],
        ));

        let outcome = enricher(&client).enrich(&note(
            "",
            NoteKind::Image {
                image_path: Some(file.path().to_path_buf()),
            },
        ));

        assert!(outcome.is_enriched());
        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts[0].1, vec!["aGk=".to_string()]);
        assert_eq!(*client.embedded.lock().unwrap(), vec!["buy eggs"]);
    }

    #[test]
    fn image_caption_precedes_json_output_marker() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hi").unwrap();
        let client = Arc::new(MockClient::new("{}", vec![1.0]));
        let image = NoteKind::Image {
            image_path: Some(file.path().to_path_buf()),
        };

        enricher(&client).enrich(&note("whiteboard from standup", image.clone()));
        enricher(&client).enrich(&note("  ", image));

        let prompts = client.prompts.lock().unwrap();
        let captioned = &prompts[0].0;
        let caption_at = captioned.find("USER CAPTION:\nwhiteboard from standup").unwrap();
        assert!(caption_at < captioned.find("JSON OUTPUT:").unwrap());
        assert!(captioned.ends_with("JSON OUTPUT:"));

        let plain = &prompts[1].0;
        assert!(!plain.contains("USER CAPTION"));
        assert!(!plain.contains("{caption}"));
        assert!(plain.ends_with("JSON OUTPUT:"));
    }

    #[test]
    fn image_note_with_missing_file_fails() {
        let client = Arc::new(MockClient::new("{}", vec![1.0]));

        let outcome = enricher(&client).enrich(&note(
            "",
            NoteKind::Image {
                image_path: Some(PathBuf::from("/definitely/not/here.png")),
            },
        ));

        match outcome {
            EnrichmentOutcome::Failed { reason } => assert!(reason.contains("cannot read image")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
