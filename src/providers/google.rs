//! Google Gemini/Imagen adapter.
//!
//! Speaks the `generateContent` API with text+image response modalities.
//! The model either returns an `inlineData` part carrying the image, or
//! declines with a text part; the decline text becomes the failure message.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::require_env_any;
use crate::media::{load_reference_images, save_base64};
use crate::provider::ImageProvider;
use crate::types::{GenerationOutcome, GenerationRequest, GenerationSuccess};
use crate::utils::http::send_checked_json;
use crate::{PixgenError, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_ENV: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];

pub const MODELS: &[&str] = &["gemini", "gemini-pro", "imagen", "imagen-fast", "imagen-ultra"];

fn backend_model(model: &str) -> Result<&'static str> {
    match model {
        "gemini" => Ok("gemini-2.5-flash-image"),
        "gemini-pro" => Ok("gemini-3-pro-image-preview"),
        "imagen" => Ok("imagen-4.0-generate-001"),
        "imagen-fast" => Ok("imagen-4.0-fast-generate-001"),
        "imagen-ultra" => Ok("imagen-4.0-ultra-generate-001"),
        other => Err(PixgenError::Config(format!(
            "model '{other}' is not served by the google provider"
        ))),
    }
}

/// `1K`/`2K`/`4K` size hint accepted by the image config, case-insensitive.
fn image_size_hint(size: Option<&str>) -> Option<String> {
    let size = size?.trim().to_ascii_uppercase();
    matches!(size.as_str(), "1K" | "2K" | "4K").then_some(size)
}

pub struct Google {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Google {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(require_env_any(API_KEY_ENV)?))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn generate_url(&self, backend: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/models/{backend}:generateContent")
    }

    async fn build_body(&self, request: &GenerationRequest) -> Result<Value> {
        let mut parts = vec![json!({ "text": request.composed_prompt() })];
        for reference in load_reference_images(&request.reference_images).await? {
            parts.push(json!({
                "inlineData": { "mimeType": reference.mime, "data": reference.data }
            }));
        }

        let mut image_config = json!({ "aspectRatio": request.effective_aspect_ratio() });
        if let Some(size) = image_size_hint(request.size.as_deref()) {
            image_config["imageSize"] = Value::String(size);
        }

        let mut generation_config = json!({
            "responseModalities": ["TEXT", "IMAGE"],
            "imageConfig": image_config,
        });
        if let Some(seed) = request.seed {
            generation_config["seed"] = json!(seed);
        }

        Ok(json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": generation_config,
        }))
    }

    async fn request_image(&self, request: &GenerationRequest, output: &Path) -> Result<()> {
        let backend = backend_model(&request.model)?;
        let body = self.build_body(request).await?;
        debug!(model = backend, "sending google generateContent request");

        let response: GenerateContentResponse = send_checked_json(
            self.http
                .post(self.generate_url(backend))
                .header("x-goog-api-key", &self.api_key)
                .json(&body),
        )
        .await?;

        match response.into_reply() {
            ImageReply::Inline { data } => save_base64(output, &data).await,
            ImageReply::Declined(reason) => Err(PixgenError::InvalidResponse(reason)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

/// The two documented response shapes, decoded once at the adapter boundary.
enum ImageReply {
    Inline { data: String },
    Declined(String),
}

impl GenerateContentResponse {
    fn into_reply(self) -> ImageReply {
        let mut texts = Vec::<String>::new();
        for candidate in self.candidates {
            let Some(content) = candidate.content else {
                continue;
            };
            for part in content.parts {
                if let Some(inline) = part.inline_data {
                    return ImageReply::Inline { data: inline.data };
                }
                if let Some(text) = part.text.filter(|t| !t.trim().is_empty()) {
                    texts.push(text);
                }
            }
        }
        if texts.is_empty() {
            ImageReply::Declined("response contained no image data".to_string())
        } else {
            ImageReply::Declined(texts.join(" "))
        }
    }
}

/// Maps error text onto the failure taxonomy: safety block, quota, or raw
/// passthrough.
fn failure_message(err: &PixgenError) -> String {
    let raw = err.to_string();
    if raw.contains("SAFETY") || raw.contains("blocked") {
        format!("request blocked by safety filter: {raw}")
    } else if raw.contains("quota") || raw.contains("RESOURCE_EXHAUSTED") {
        format!("api quota exceeded: {raw}")
    } else {
        raw
    }
}

#[async_trait]
impl ImageProvider for Google {
    fn name(&self) -> &'static str {
        "google"
    }

    fn models(&self) -> &'static [&'static str] {
        MODELS
    }

    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        let started = Instant::now();
        let output = request.effective_output();
        match self.request_image(request, &output).await {
            Ok(()) => GenerationOutcome::Success(GenerationSuccess {
                output,
                model: request.model.clone(),
                prompt: request.prompt.clone(),
                seed: request.seed,
                elapsed: started.elapsed(),
            }),
            Err(err) => GenerationOutcome::failure(failure_message(&err)),
        }
    }
}
