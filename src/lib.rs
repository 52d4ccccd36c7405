pub(crate) mod config;
mod error;
pub mod media;
pub mod output;
pub mod postprocess;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod run;
pub mod types;
mod utils;

pub use error::{PixgenError, Result};
pub use provider::ImageProvider;
pub use providers::{Google, OpenAi, Replicate};
pub use registry::{MODEL_TABLE, ProviderKind, ProviderRegistry, list_models, provider_kind_for_model};
pub use run::{RunSummary, run_variations};
pub use types::{
    GenerationOutcome, GenerationRequest, GenerationSuccess, Quality, Style,
};
