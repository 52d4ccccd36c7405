//! Model routing and the lazy per-provider instance cache.

use std::collections::HashMap;
use std::sync::Arc;

use crate::provider::ImageProvider;
use crate::providers::{Google, OpenAi, Replicate};
use crate::{PixgenError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Google,
    OpenAi,
    Replicate,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::OpenAi => "openai",
            Self::Replicate => "replicate",
        }
    }
}

/// The sole source of truth for routing a model name to its provider.
pub const MODEL_TABLE: &[(&str, ProviderKind)] = &[
    ("gemini", ProviderKind::Google),
    ("gemini-pro", ProviderKind::Google),
    ("imagen", ProviderKind::Google),
    ("imagen-fast", ProviderKind::Google),
    ("imagen-ultra", ProviderKind::Google),
    ("gpt-image-1", ProviderKind::OpenAi),
    ("gpt-image-1.5", ProviderKind::OpenAi),
    ("dall-e-3", ProviderKind::OpenAi),
    ("flux-schnell", ProviderKind::Replicate),
    ("flux", ProviderKind::Replicate),
    ("flux-pro", ProviderKind::Replicate),
];

pub fn provider_kind_for_model(model: &str) -> Result<ProviderKind> {
    MODEL_TABLE
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| {
            PixgenError::Config(format!(
                "unknown model '{model}' (use --list-models to see available models)"
            ))
        })
}

/// Models in table order, for `--list-models` output.
pub fn list_models() -> &'static [(&'static str, ProviderKind)] {
    MODEL_TABLE
}

/// Lazily constructs one instance per provider and reuses it for every later
/// request in the process. Construction failures (missing credentials) are not
/// cached, so a later lookup retries.
#[derive(Default)]
pub struct ProviderRegistry {
    cache: HashMap<ProviderKind, Arc<dyn ImageProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider_for_model(&mut self, model: &str) -> Result<Arc<dyn ImageProvider>> {
        let kind = provider_kind_for_model(model)?;
        if let Some(provider) = self.cache.get(&kind) {
            return Ok(Arc::clone(provider));
        }
        let provider: Arc<dyn ImageProvider> = match kind {
            ProviderKind::Google => Arc::new(Google::from_env()?),
            ProviderKind::OpenAi => Arc::new(OpenAi::from_env()?),
            ProviderKind::Replicate => Arc::new(Replicate::from_env()?),
        };
        self.cache.insert(kind, Arc::clone(&provider));
        Ok(provider)
    }
}
