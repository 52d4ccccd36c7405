//! Replicate (Flux) adapter.
//!
//! Creates a prediction with `Prefer: wait` and polls the prediction URL when
//! the backend hands back a non-terminal status. Output is a URL, or an array
//! of URLs of which the first is used.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::require_env_any;
use crate::media::{download_to, load_reference_images};
use crate::provider::ImageProvider;
use crate::types::{GenerationOutcome, GenerationRequest, GenerationSuccess};
use crate::utils::http::send_checked_json;
use crate::{PixgenError, Result};

const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";
const API_KEY_ENV: &[&str] = &["REPLICATE_API_TOKEN"];

pub const MODELS: &[&str] = &["flux-schnell", "flux", "flux-pro"];

/// Denoising strength applied when a reference image drives image-to-image.
const IMAGE_PROMPT_STRENGTH: f64 = 0.8;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Adapter-owned secondary mapping: a miss here is a generation failure, not
/// a routing error, because the registry already vouched for the model name.
fn model_slug(model: &str) -> Option<&'static str> {
    match model {
        "flux-schnell" => Some("black-forest-labs/flux-schnell"),
        "flux" => Some("black-forest-labs/flux-dev"),
        "flux-pro" => Some("black-forest-labs/flux-1.1-pro"),
        _ => None,
    }
}

#[derive(Debug)]
pub struct Replicate {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl Replicate {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(require_env_any(API_KEY_ENV)?))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn predictions_url(&self, slug: &str) -> String {
        format!(
            "{}/models/{slug}/predictions",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn build_input(&self, request: &GenerationRequest) -> Result<Value> {
        let mut input = Map::<String, Value>::new();
        input.insert("prompt".to_string(), json!(request.composed_prompt()));
        input.insert(
            "aspect_ratio".to_string(),
            json!(request.effective_aspect_ratio()),
        );
        if let Some(seed) = request.seed {
            input.insert("seed".to_string(), json!(seed));
        }
        if let Some(steps) = request.steps {
            input.insert("num_inference_steps".to_string(), json!(steps));
        }
        if let Some(guidance) = request.guidance {
            input.insert("guidance".to_string(), json!(guidance));
        }
        // At most one reference image is supported for image-to-image.
        if let Some(reference) = load_reference_images(&request.reference_images)
            .await?
            .into_iter()
            .next()
        {
            input.insert("image".to_string(), json!(reference.data_uri()));
            input.insert(
                "prompt_strength".to_string(),
                json!(IMAGE_PROMPT_STRENGTH),
            );
        }
        Ok(Value::Object(input))
    }

    async fn wait_for_terminal(&self, mut prediction: Prediction) -> Result<Prediction> {
        while matches!(prediction.status.as_str(), "starting" | "processing") {
            let Some(poll_url) = prediction.urls.as_ref().and_then(|u| u.get.clone()) else {
                return Err(PixgenError::InvalidResponse(
                    "prediction is still running but has no poll url".to_string(),
                ));
            };
            tokio::time::sleep(POLL_INTERVAL).await;
            debug!(url = %poll_url, "polling replicate prediction");
            prediction = send_checked_json(
                self.http
                    .get(&poll_url)
                    .bearer_auth(&self.token),
            )
            .await?;
        }
        Ok(prediction)
    }

    async fn request_image(&self, request: &GenerationRequest, output: &Path) -> Result<()> {
        let slug = model_slug(&request.model).ok_or_else(|| {
            PixgenError::InvalidResponse(format!(
                "no replicate slug for model '{}'",
                request.model
            ))
        })?;

        let input = self.build_input(request).await?;
        debug!(slug, "creating replicate prediction");
        let prediction: Prediction = send_checked_json(
            self.http
                .post(self.predictions_url(slug))
                .bearer_auth(&self.token)
                .header("Prefer", "wait")
                .json(&json!({ "input": input })),
        )
        .await?;

        let prediction = self.wait_for_terminal(prediction).await?;
        if prediction.status != "succeeded" {
            let detail = match prediction.error.as_ref() {
                Some(Value::String(message)) => message.clone(),
                Some(other) => other.to_string(),
                None => format!("prediction {}", prediction.status),
            };
            return Err(PixgenError::InvalidResponse(detail));
        }

        let url = output_url(prediction.output.as_ref())?;
        download_to(&self.http, &url, output).await
    }
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    get: Option<String>,
}

/// Output may be a single URL or an array of URLs; the first entry wins. Any
/// other shape is an unexpected-format failure.
fn output_url(output: Option<&Value>) -> Result<String> {
    match output {
        Some(Value::String(url)) => Ok(url.clone()),
        Some(Value::Array(items)) => items
            .first()
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PixgenError::InvalidResponse("prediction output array is empty".to_string())
            }),
        _ => Err(PixgenError::InvalidResponse(
            "unexpected prediction output format".to_string(),
        )),
    }
}

#[async_trait]
impl ImageProvider for Replicate {
    fn name(&self) -> &'static str {
        "replicate"
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

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, Method::POST, MockServer};

    fn request_for(model: &str, output: &Path) -> GenerationRequest {
        let mut request = GenerationRequest::new(model, "a red cube");
        request.output = Some(output.to_path_buf());
        request
    }

    #[test]
    fn slug_lookup_covers_all_served_models() {
        for model in MODELS {
            assert!(model_slug(model).is_some(), "no slug for {model}");
        }
        assert!(model_slug("gemini").is_none());
    }

    #[test]
    fn output_url_takes_first_array_entry() {
        let output = json!(["http://a/1.png", "http://a/2.png"]);
        assert_eq!(output_url(Some(&output)).unwrap(), "http://a/1.png");
    }

    #[test]
    fn non_string_output_is_unexpected_format() {
        let err = output_url(Some(&json!(42))).unwrap_err();
        assert!(err.to_string().contains("unexpected prediction output"));
        assert!(output_url(None).is_err());
    }

    #[tokio::test]
    async fn array_output_is_downloaded() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/models/black-forest-labs/flux-dev/predictions")
                    .header("authorization", "Bearer test-token")
                    .header("prefer", "wait")
                    .body_includes("\"aspect_ratio\":\"16:9\"");
                then.status(201)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({
                            "status": "succeeded",
                            "output": [server.url("/files/a.webp")]
                        })
                        .to_string(),
                    );
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/files/a.webp");
                then.status(200).body(&[4u8, 5, 6][..]);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.webp");
        let request = request_for("flux", &output);

        let client = Replicate::new("test-token").with_base_url(server.url("/v1"));
        let outcome = client.generate(&request).await;

        create.assert_async().await;
        assert!(outcome.is_success(), "unexpected outcome: {outcome:?}");
        assert_eq!(std::fs::read(&output).unwrap(), vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn non_terminal_prediction_is_polled() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/models/black-forest-labs/flux-schnell/predictions");
                then.status(201)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({
                            "status": "processing",
                            "urls": { "get": server.url("/v1/predictions/p1") }
                        })
                        .to_string(),
                    );
            })
            .await;
        let poll = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/predictions/p1");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({
                            "status": "succeeded",
                            "output": server.url("/files/b.png")
                        })
                        .to_string(),
                    );
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/files/b.png");
                then.status(200).body(&[1u8][..]);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.png");
        let request = request_for("flux-schnell", &output);

        let client = Replicate::new("test-token").with_base_url(server.url("/v1"));
        let outcome = client.generate(&request).await;

        poll.assert_async().await;
        assert!(outcome.is_success(), "unexpected outcome: {outcome:?}");
    }

    #[tokio::test]
    async fn failed_prediction_reports_backend_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/models/black-forest-labs/flux-1.1-pro/predictions");
                then.status(201)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({
                            "status": "failed",
                            "error": "NSFW content detected"
                        })
                        .to_string(),
                    );
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let request = request_for("flux-pro", &dir.path().join("out.png"));
        let client = Replicate::new("test-token").with_base_url(server.url("/v1"));

        match client.generate(&request).await {
            GenerationOutcome::Failure { message } => {
                assert!(message.contains("NSFW content detected"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
