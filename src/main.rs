use std::path::PathBuf;
use std::process;

use clap::Parser;
use clap::builder::PossibleValuesParser;

use pixgen::types::ASPECT_RATIOS;
use pixgen::{
    GenerationRequest, ProviderRegistry, Quality, Result, Style, list_models, run_variations,
};

#[derive(Parser, Debug)]
#[command(
    name = "pixgen",
    version,
    about = "Generate images with Google Gemini/Imagen, OpenAI, or Replicate Flux models"
)]
struct Cli {
    /// Text prompt describing the image
    #[arg(required_unless_present = "list_models")]
    prompt: Option<String>,

    /// Model to use (see --list-models)
    #[arg(short, long, default_value = "gemini")]
    model: String,

    /// Aspect ratio of the generated image
    #[arg(long, value_parser = PossibleValuesParser::new(ASPECT_RATIOS.iter().copied()))]
    aspect_ratio: Option<String>,

    /// Image size: 1K/2K/4K or an explicit WxH
    #[arg(long)]
    size: Option<String>,

    /// Output file path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Reference image for image-to-image or editing (repeatable)
    #[arg(short = 'i', long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,

    /// Request a transparent background
    #[arg(long)]
    transparent: bool,

    /// Remove the background via remove.bg after generation
    #[arg(long)]
    remove_bg: bool,

    /// Fill the background with a hex color after generation
    #[arg(long, value_name = "HEX")]
    add_bg: Option<String>,

    /// Things the image should avoid
    #[arg(long)]
    negative_prompt: Option<String>,

    /// Write a thumbnail next to the output (optional pixel size)
    #[arg(
        long,
        value_name = "PX",
        num_args = 0..=1,
        default_missing_value = "256"
    )]
    thumbnail: Option<u32>,

    /// Number of variations to generate
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=10))]
    variations: u8,

    /// Generation seed
    #[arg(long)]
    seed: Option<u64>,

    /// Diffusion step count
    #[arg(long)]
    steps: Option<u32>,

    /// Guidance scale
    #[arg(long)]
    guidance: Option<f32>,

    /// Output quality
    #[arg(long, value_enum)]
    quality: Option<Quality>,

    /// Rendering style (DALL-E 3)
    #[arg(long, value_enum)]
    style: Option<Style>,

    /// Number of images the backend should return per call
    #[arg(long)]
    num_images: Option<u8>,

    /// List available models and exit
    #[arg(long)]
    list_models: bool,
}

impl Cli {
    fn into_request(self) -> GenerationRequest {
        let mut request = GenerationRequest::new(
            self.model,
            self.prompt.expect("prompt required unless --list-models"),
        );
        request.negative_prompt = self.negative_prompt;
        request.aspect_ratio = self.aspect_ratio;
        request.size = self.size;
        request.output = self.output;
        request.reference_images = self.images;
        request.transparent = self.transparent;
        request.remove_background = self.remove_bg;
        request.background = self.add_bg;
        request.thumbnail = self.thumbnail;
        request.variations = self.variations;
        request.seed = self.seed;
        request.steps = self.steps;
        request.guidance = self.guidance;
        request.quality = self.quality;
        request.style = self.style;
        request.num_images = self.num_images;
        request
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.list_models {
        for (model, kind) in list_models() {
            println!("{model:<16} {}", kind.as_str());
        }
        return Ok(());
    }

    let request = cli.into_request();
    let mut registry = ProviderRegistry::new();
    let provider = registry.provider_for_model(&request.model)?;
    let summary = run_variations(provider.as_ref(), &request).await?;

    println!("Model: {}", summary.model);
    for path in &summary.outputs {
        println!("Saved: {}", path.display());
    }

    // Best-effort preview of the first image; never awaited or reported.
    #[cfg(target_os = "macos")]
    if let Some(first) = summary.outputs.first() {
        let _ = std::process::Command::new("open").arg(first).spawn();
    }

    Ok(())
}
