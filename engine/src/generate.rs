use serde::{Serialize, Deserialize};
use tracing::{info, warn};
use crate::editor::Editor;
use crate::error::{EditorError, Result};
use crate::export::ExportedFile;
use crate::intake::DataUrl;

pub const NO_IMAGE_MESSAGE: &str = "No image was generated. The model may have refused the prompt.";
const FAILURE_PREFIX: &str = "Failed to generate image: ";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub data: String,
    pub mime_type: String,
}

impl From<DataUrl> for InlineData {
    fn from(url: DataUrl) -> Self {
        InlineData { data: url.data, mime_type: url.mime_type }
    }
}

impl From<InlineData> for DataUrl {
    fn from(inline: InlineData) -> Self {
        DataUrl { mime_type: inline.mime_type, data: inline.data }
    }
}

/// Snapshot handed to the generation service. Later edits do not affect it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub image: InlineData,
    pub prompt: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Candidate {
    #[serde(default)]
    pub content: Content,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct GenerationResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerationResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EditorError::external(format!("malformed response: {}", e)))
    }

    /// First inline image of the first candidate.
    pub fn first_image(&self) -> Option<&InlineData> {
        self.candidates.first()?.content.parts.iter().find_map(|p| p.inline_data.as_ref())
    }
}

/// The external image-editing service.
pub trait ImageGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse>;
}

/// Progress and outcome of the most recent generation.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct GenerationState {
    pub in_progress: bool,
    #[serde(skip)]
    pub output: Option<DataUrl>,
    pub error: Option<String>,
}

impl GenerationState {
    pub(crate) fn reset(&mut self) {
        self.output = None;
        self.error = None;
    }
}

fn as_service_failure(err: EditorError) -> EditorError {
    let msg = match err {
        EditorError::ExternalService(msg) => msg,
        other => other.to_string(),
    };
    if msg.starts_with(FAILURE_PREFIX) {
        EditorError::ExternalService(msg)
    } else {
        EditorError::ExternalService(format!("{}{}", FAILURE_PREFIX, msg))
    }
}

impl Editor {
    pub fn generation(&self) -> &GenerationState {
        &self.generation
    }

    /// Flattens the scene and snapshots it with the prompt. Marks the
    /// session as generating and clears the previous result.
    pub fn prepare_generation(&mut self, prompt: &str) -> Result<GenerationRequest> {
        if self.store.base().image.is_none() {
            return Err(EditorError::invalid_input("load a base image before generating"));
        }
        self.generation.reset();
        self.generation.in_progress = true;
        let image = match self.flatten_data_url() {
            Ok(url) => url,
            Err(e) => {
                self.generation.in_progress = false;
                self.generation.error = Some(e.to_string());
                return Err(e);
            }
        };
        let prompt = self.config.prompt_or_default(prompt).to_string();
        info!(prompt = %prompt, "generation requested");
        Ok(GenerationRequest { image: image.into(), prompt })
    }

    /// Applies the service outcome. Clears the in-progress flag either way.
    pub fn complete_generation(&mut self, outcome: Result<GenerationResponse>) -> Result<DataUrl> {
        self.generation.in_progress = false;
        let image = outcome.and_then(|response| {
            response
                .first_image()
                .cloned()
                .ok_or_else(|| EditorError::external(NO_IMAGE_MESSAGE))
        });
        match image {
            Ok(inline) => {
                let url: DataUrl = inline.into();
                self.generation.output = Some(url.clone());
                self.generation.error = None;
                info!(mime = %url.mime_type, "generation finished");
                Ok(url)
            }
            Err(e) => {
                let err = as_service_failure(e);
                warn!(error = %err, "generation failed");
                self.generation.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn generate(&mut self, generator: &dyn ImageGenerator, prompt: &str) -> Result<DataUrl> {
        let request = self.prepare_generation(prompt)?;
        let outcome = generator.generate(&request);
        self.complete_generation(outcome)
    }

    /// The generated image as a downloadable file.
    pub fn output_download(&self) -> Result<ExportedFile> {
        let url = self.generation.output.as_ref().ok_or_else(|| EditorError::invalid_input("no generated image to export"))?;
        Ok(ExportedFile {
            name: self.config.download_name.clone(),
            mime_type: url.mime_type.clone(),
            bytes: url.bytes()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PROMPT;
    use crate::intake::tests::png_bytes;
    use std::cell::RefCell;

    struct Canned {
        reply: Result<GenerationResponse>,
        seen: RefCell<Vec<GenerationRequest>>,
    }

    impl ImageGenerator for Canned {
        fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
            self.seen.borrow_mut().push(request.clone());
            match &self.reply {
                Ok(r) => Ok(r.clone()),
                Err(e) => Err(EditorError::external(e.to_string())),
            }
        }
    }

    fn image_reply(data: &str) -> GenerationResponse {
        GenerationResponse {
            candidates: vec![Candidate {
                content: Content {
                    parts: vec![
                        Part { text: Some("here you go".into()), ..Default::default() },
                        Part { inline_data: Some(InlineData { data: data.into(), mime_type: "image/png".into() }), text: None },
                    ],
                },
            }],
        }
    }

    fn editor() -> Editor {
        let mut ed = Editor::default();
        ed.upload_base_image(&png_bytes(8, 8, [50, 60, 70, 255])).unwrap();
        ed
    }

    #[test]
    fn empty_prompt_uses_default_verbatim() {
        let mut ed = editor();
        let request = ed.prepare_generation("").unwrap();
        assert_eq!(request.prompt, DEFAULT_PROMPT);
        assert_eq!(request.image.mime_type, "image/png");
        assert!(ed.generation().in_progress);
        let request = ed.prepare_generation("make it dusk").unwrap();
        assert_eq!(request.prompt, "make it dusk");
    }

    #[test]
    fn successful_generation_stores_output() {
        let mut ed = editor();
        let payload = DataUrl::encode("image/png", &png_bytes(2, 2, [1, 1, 1, 255]));
        let generator = Canned { reply: Ok(image_reply(&payload.data)), seen: RefCell::new(Vec::new()) };
        let url = ed.generate(&generator, "").unwrap();
        assert_eq!(url, payload);
        assert!(!ed.generation().in_progress);
        assert_eq!(ed.generation().error, None);
        let file = ed.output_download().unwrap();
        assert_eq!(file.name, "final-image.png");
        assert_eq!(image::load_from_memory(&file.bytes).unwrap().width(), 2);

        let sent = &generator.seen.borrow()[0];
        let flattened = DataUrl::from(sent.image.clone()).bytes().unwrap();
        assert_eq!(image::load_from_memory(&flattened).unwrap().width(), 8);
    }

    #[test]
    fn zero_images_is_a_reported_failure() {
        let mut ed = editor();
        let text_only = GenerationResponse {
            candidates: vec![Candidate { content: Content { parts: vec![Part { text: Some("no".into()), ..Default::default() }] } }],
        };
        let err = ed.complete_generation(Ok(text_only)).unwrap_err();
        assert_eq!(err.to_string(), format!("Failed to generate image: {}", NO_IMAGE_MESSAGE));
        assert_eq!(ed.generation().error.as_deref(), Some(err.to_string().as_str()));
        assert!(ed.generation().output.is_none());
        assert!(ed.output_download().is_err());
    }

    #[test]
    fn transport_error_is_wrapped_and_retryable() {
        let mut ed = editor();
        let failing = Canned { reply: Err(EditorError::external("timeout")), seen: RefCell::new(Vec::new()) };
        let err = ed.generate(&failing, "x").unwrap_err();
        assert_eq!(err.to_string(), "Failed to generate image: timeout");
        assert!(!ed.generation().in_progress);

        let ok = Canned { reply: Ok(image_reply("QUJD")), seen: RefCell::new(Vec::new()) };
        assert!(ed.generate(&ok, "x").is_ok());
        assert_eq!(ed.generation().error, None);
    }

    #[test]
    fn generation_needs_a_base_image() {
        let mut ed = Editor::default();
        assert!(matches!(ed.prepare_generation("hi"), Err(EditorError::InvalidInput(_))));
        assert!(!ed.generation().in_progress);
    }

    #[test]
    fn new_base_image_clears_previous_output() {
        let mut ed = editor();
        ed.complete_generation(Ok(image_reply("QUJD"))).unwrap();
        assert!(ed.generation().output.is_some());
        ed.upload_base_image(&png_bytes(4, 4, [0, 0, 0, 255])).unwrap();
        assert!(ed.generation().output.is_none());
    }

    #[test]
    fn parses_service_json() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"hi"},{"inlineData":{"data":"QUJD","mimeType":"image/jpeg"}}]}}]}"#;
        let response = GenerationResponse::from_json(json).unwrap();
        assert_eq!(response.first_image().unwrap().mime_type, "image/jpeg");
        assert_eq!(GenerationResponse::from_json("{}").unwrap().first_image(), None);
        assert!(GenerationResponse::from_json("nope").is_err());
    }
}
