//! Per-invocation orchestration: one generation per variation, each followed
//! by the conditional post-processing chain.

use std::path::PathBuf;

use tracing::info;

use crate::output::variation_paths;
use crate::postprocess;
use crate::provider::ImageProvider;
use crate::types::{GenerationOutcome, GenerationRequest};
use crate::{PixgenError, Result};

#[derive(Debug)]
pub struct RunSummary {
    pub model: String,
    pub outputs: Vec<PathBuf>,
}

/// Generates every requested variation in sequence. The first failed
/// generation aborts the run; later variations are not attempted and files
/// written by earlier variations stay on disk.
pub async fn run_variations(
    provider: &dyn ImageProvider,
    request: &GenerationRequest,
) -> Result<RunSummary> {
    let base = request.effective_output();
    let paths = variation_paths(&base, request.variations);
    let mut outputs = Vec::with_capacity(paths.len());

    for (index, path) in paths.iter().enumerate() {
        info!(
            provider = provider.name(),
            model = %request.model,
            variation = index + 1,
            total = paths.len(),
            "generating image"
        );
        let mut variation = request.clone();
        variation.output = Some(path.clone());

        match provider.generate(&variation).await {
            GenerationOutcome::Success(success) => {
                postprocess_chain(&variation, &success.output).await?;
                info!(output = %success.output.display(), elapsed = ?success.elapsed, "saved image");
                outputs.push(success.output);
            }
            GenerationOutcome::Failure { message } => {
                return Err(PixgenError::Generation(message));
            }
        }
    }

    Ok(RunSummary {
        model: request.model.clone(),
        outputs,
    })
}

/// Fixed order: remove background, fill background color, thumbnail. Each
/// step is gated on its own flag; any step error is fatal for the run.
async fn postprocess_chain(request: &GenerationRequest, output: &std::path::Path) -> Result<()> {
    if request.remove_background {
        postprocess::remove_background(output).await?;
    }
    if let Some(color) = request.background.as_deref() {
        postprocess::apply_background(output, color)?;
    }
    if let Some(size) = request.thumbnail {
        postprocess::make_thumbnail(output, size).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationSuccess;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Succeeds until the configured call number, then fails.
    struct FlakyProvider {
        calls: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait]
    impl ImageProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn models(&self) -> &'static [&'static str] {
            &["flaky-1"]
        }

        async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on {
                GenerationOutcome::failure(format!("backend refused variation {call}"))
            } else {
                GenerationOutcome::Success(GenerationSuccess {
                    output: request.effective_output(),
                    model: request.model.clone(),
                    prompt: request.prompt.clone(),
                    seed: request.seed,
                    elapsed: Duration::from_millis(1),
                })
            }
        }
    }

    #[tokio::test]
    async fn failing_variation_halts_the_run() {
        let provider = FlakyProvider {
            calls: AtomicUsize::new(0),
            fail_on: 2,
        };
        let mut request = GenerationRequest::new("flaky-1", "a red cube");
        request.output = Some(PathBuf::from("/tmp/out.png"));
        request.variations = 3;

        let err = run_variations(&provider, &request).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "generation failed: backend refused variation 2"
        );
        // Variation 3 must never be attempted.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn all_variations_report_their_paths() {
        let provider = FlakyProvider {
            calls: AtomicUsize::new(0),
            fail_on: usize::MAX,
        };
        let mut request = GenerationRequest::new("flaky-1", "a red cube");
        request.output = Some(PathBuf::from("/tmp/out.png"));
        request.variations = 3;

        let summary = run_variations(&provider, &request).await.unwrap();
        assert_eq!(summary.model, "flaky-1");
        assert_eq!(
            summary.outputs,
            vec![
                PathBuf::from("/tmp/out-v1.png"),
                PathBuf::from("/tmp/out-v2.png"),
                PathBuf::from("/tmp/out-v3.png"),
            ]
        );
    }

    #[tokio::test]
    async fn single_variation_uses_base_path() {
        let provider = FlakyProvider {
            calls: AtomicUsize::new(0),
            fail_on: usize::MAX,
        };
        let mut request = GenerationRequest::new("flaky-1", "a red cube");
        request.output = Some(PathBuf::from("solo.png"));

        let summary = run_variations(&provider, &request).await.unwrap();
        assert_eq!(summary.outputs, vec![PathBuf::from("solo.png")]);
    }
}
