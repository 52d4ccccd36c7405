use thiserror::Error;

#[derive(Debug, Error)]
pub enum PixgenError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("api error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("post-processing failed: {0}")]
    PostProcess(String),
}

pub type Result<T> = std::result::Result<T, PixgenError>;
