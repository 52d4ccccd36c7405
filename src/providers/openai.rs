//! OpenAI images adapter.
//!
//! Two wire shapes behind one contract: JSON `images/generations` for
//! text-to-image, multipart `images/edits` when reference images are present
//! and the model supports editing. Responses carry either a base64 payload or
//! a URL; whichever is populated gets persisted.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::require_env_any;
use crate::media::{download_to, mime_from_path, save_base64};
use crate::provider::ImageProvider;
use crate::types::{GenerationOutcome, GenerationRequest, GenerationSuccess, Quality, Style};
use crate::utils::http::error_body_truncated;
use crate::{PixgenError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const API_KEY_ENV: &[&str] = &["OPENAI_API_KEY"];

pub const MODELS: &[&str] = &["gpt-image-1", "gpt-image-1.5", "dall-e-3"];

/// Only the 1.5 model accepts the multipart edit call.
const EDIT_CAPABLE_MODEL: &str = "gpt-image-1.5";

static PIXEL_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2,5}x\d{2,5}$").expect("valid size regex"));

/// Nearest supported pixel size for an aspect ratio. Total over
/// `types::ASPECT_RATIOS`; unknown ratios fall back to square.
pub(crate) fn size_for_aspect(ratio: &str) -> &'static str {
    match ratio {
        "1:1" => "1024x1024",
        "16:9" | "4:3" | "3:2" | "21:9" => "1536x1024",
        "9:16" | "3:4" | "2:3" => "1024x1536",
        _ => "1024x1024",
    }
}

fn quality_param(quality: Option<Quality>) -> &'static str {
    match quality {
        Some(Quality::Hd) => "high",
        _ => "medium",
    }
}

pub struct OpenAi {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAi {
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

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    fn pixel_size(request: &GenerationRequest) -> String {
        if let Some(size) = request.size.as_deref().filter(|s| PIXEL_SIZE.is_match(s)) {
            return size.to_string();
        }
        size_for_aspect(request.effective_aspect_ratio()).to_string()
    }

    fn wants_edit_mode(request: &GenerationRequest) -> bool {
        !request.reference_images.is_empty() && request.model == EDIT_CAPABLE_MODEL
    }

    fn generation_body(request: &GenerationRequest) -> Value {
        let mut body = Map::<String, Value>::new();
        body.insert("model".to_string(), json!(request.model));
        body.insert("prompt".to_string(), json!(request.composed_prompt()));
        body.insert("size".to_string(), json!(Self::pixel_size(request)));
        body.insert("quality".to_string(), json!(quality_param(request.quality)));
        body.insert(
            "background".to_string(),
            json!(if request.transparent { "transparent" } else { "opaque" }),
        );
        if let Some(n) = request.num_images {
            body.insert("n".to_string(), json!(n));
        }
        if request.model == "dall-e-3" {
            if let Some(style) = request.style {
                let style = match style {
                    Style::Vivid => "vivid",
                    Style::Natural => "natural",
                };
                body.insert("style".to_string(), json!(style));
            }
        }
        Value::Object(body)
    }

    async fn edit_form(&self, request: &GenerationRequest) -> Result<Form> {
        let mut form = Form::new()
            .text("model", request.model.clone())
            .text("prompt", request.composed_prompt())
            .text("size", Self::pixel_size(request))
            .text("quality", quality_param(request.quality).to_string());
        for path in &request.reference_images {
            let bytes = tokio::fs::read(path).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image.png".to_string());
            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str(mime_from_path(path))?;
            form = form.part("image[]", part);
        }
        Ok(form)
    }

    async fn decode_or_fail(&self, response: reqwest::Response) -> Result<ImagesResponse> {
        let status = response.status();
        if !status.is_success() {
            let body = error_body_truncated(response).await;
            // Prefer the structured API error message over the raw body.
            if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(&body) {
                if let Some(error) = parsed.error {
                    return Err(PixgenError::Api {
                        status,
                        body: error.message,
                    });
                }
            }
            return Err(PixgenError::Api { status, body });
        }
        Ok(response.json::<ImagesResponse>().await?)
    }

    async fn request_image(&self, request: &GenerationRequest, output: &Path) -> Result<()> {
        let response = if Self::wants_edit_mode(request) {
            debug!(model = %request.model, "sending openai image edit request");
            let form = self.edit_form(request).await?;
            self.http
                .post(self.endpoint("images/edits"))
                .bearer_auth(&self.api_key)
                .multipart(form)
                .send()
                .await?
        } else {
            debug!(model = %request.model, "sending openai image generation request");
            self.http
                .post(self.endpoint("images/generations"))
                .bearer_auth(&self.api_key)
                .json(&Self::generation_body(request))
                .send()
                .await?
        };

        let parsed = self.decode_or_fail(response).await?;
        let Some(first) = parsed.data.into_iter().next() else {
            return Err(PixgenError::InvalidResponse(
                "response contained no image data".to_string(),
            ));
        };

        if let Some(data) = first.b64_json.filter(|d| !d.trim().is_empty()) {
            return save_base64(output, &data).await;
        }
        if let Some(url) = first.url.filter(|u| !u.trim().is_empty()) {
            return download_to(&self.http, &url, output).await;
        }
        Err(PixgenError::InvalidResponse(
            "image item is missing both url and b64_json".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl ImageProvider for OpenAi {
    fn name(&self) -> &'static str {
        "openai"
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
            Err(err) => GenerationOutcome::failure(err.to_string()),
        }
    }
}
