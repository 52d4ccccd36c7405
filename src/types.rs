use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::media::compose_prompt;

pub const DEFAULT_ASPECT_RATIO: &str = "16:9";
pub const DEFAULT_OUTPUT: &str = "generated-image.png";

/// Aspect ratios accepted by every adapter. Each entry must have a row in the
/// OpenAI size table (`providers::openai::size_for_aspect`).
pub const ASPECT_RATIOS: &[&str] = &["1:1", "16:9", "9:16", "4:3", "3:4", "3:2", "2:3", "21:9"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Standard,
    Hd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    Vivid,
    Natural,
}

/// One generation intent, immutable for the duration of a call.
///
/// `model` must be present in the routing table (`registry::MODEL_TABLE`);
/// an unknown model is a configuration error caught before any provider code
/// runs, never a runtime provider failure.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub aspect_ratio: Option<String>,
    /// `1K`/`2K`/`4K` or an explicit `WxH` string, provider-specific grammar.
    pub size: Option<String>,
    pub output: Option<PathBuf>,
    pub reference_images: Vec<PathBuf>,
    pub transparent: bool,
    pub remove_background: bool,
    /// Hex color the background is flattened onto after generation.
    pub background: Option<String>,
    /// Thumbnail longest-side pixel size; `None` disables the step.
    pub thumbnail: Option<u32>,
    pub variations: u8,
    pub seed: Option<u64>,
    pub steps: Option<u32>,
    pub guidance: Option<f32>,
    pub quality: Option<Quality>,
    pub style: Option<Style>,
    pub num_images: Option<u8>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            negative_prompt: None,
            aspect_ratio: None,
            size: None,
            output: None,
            reference_images: Vec::new(),
            transparent: false,
            remove_background: false,
            background: None,
            thumbnail: None,
            variations: 1,
            seed: None,
            steps: None,
            guidance: None,
            quality: None,
            style: None,
            num_images: None,
        }
    }

    pub fn effective_aspect_ratio(&self) -> &str {
        self.aspect_ratio
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(DEFAULT_ASPECT_RATIO)
    }

    pub fn effective_output(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }

    /// Prompt with the negative prompt folded in as a trailing clause.
    pub fn composed_prompt(&self) -> String {
        compose_prompt(&self.prompt, self.negative_prompt.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct GenerationSuccess {
    pub output: PathBuf,
    pub model: String,
    pub prompt: String,
    pub seed: Option<u64>,
    pub elapsed: Duration,
}

/// Outcome of one provider call. Expected failure modes (safety block, quota,
/// missing image data, transport errors) land in `Failure`; providers do not
/// return `Err` from `generate`.
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    Success(GenerationSuccess),
    Failure { message: String },
}

impl GenerationOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
