//! Background removal via the remove.bg HTTP API.

use std::path::Path;

use reqwest::multipart::{Form, Part};

use crate::config::require_env_any;
use crate::media::{mime_from_path, save_bytes};
use crate::utils::http::send_checked;
use crate::Result;

const REMOVE_BG_URL: &str = "https://api.remove.bg/v1.0/removebg";
const API_KEY_ENV: &[&str] = &["REMOVE_BG_API_KEY"];

/// Sends the image to remove.bg and overwrites it with the processed bytes.
pub async fn remove_background(path: &Path) -> Result<()> {
    let api_key = require_env_any(API_KEY_ENV)?;
    remove_background_with(path, &api_key, REMOVE_BG_URL).await
}

pub(crate) async fn remove_background_with(path: &Path, api_key: &str, url: &str) -> Result<()> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.png".to_string());
    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime_from_path(path))?;
    let form = Form::new().part("image_file", part).text("size", "auto");

    let response = send_checked(
        reqwest::Client::new()
            .post(url)
            .header("X-Api-Key", api_key)
            .multipart(form),
    )
    .await?;
    let processed = response.bytes().await?;
    save_bytes(path, &processed).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn processed_bytes_overwrite_the_file() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1.0/removebg")
                    .header("x-api-key", "test-key");
                then.status(200).body(&[7u8, 7, 7][..]);
            })
            .await;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("subject.png");
        std::fs::write(&path, [1, 2, 3])?;

        remove_background_with(&path, "test-key", &server.url("/v1.0/removebg")).await?;

        mock.assert_async().await;
        assert_eq!(std::fs::read(&path)?, vec![7, 7, 7]);
        Ok(())
    }

    #[tokio::test]
    async fn missing_api_key_is_a_config_error() {
        if crate::config::env_nonempty("REMOVE_BG_API_KEY").is_some() {
            return;
        }
        let err = remove_background(Path::new("whatever.png")).await.unwrap_err();
        assert!(matches!(err, crate::PixgenError::Config(_)));
    }
}
