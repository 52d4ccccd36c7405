use async_trait::async_trait;

use crate::types::{GenerationOutcome, GenerationRequest};

/// Uniform contract implemented by every backend adapter.
///
/// `generate` never returns `Err`: adapters funnel declined requests and
/// transport errors alike into [`GenerationOutcome::Failure`], so the
/// orchestrator has a single path to handle. Construction is the only place
/// an adapter raises (`PixgenError::Config` for a missing credential).
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Models this adapter serves; used for registry bootstrapping and
    /// `--list-models`, not for dispatch.
    fn models(&self) -> &'static [&'static str];

    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome;
}
