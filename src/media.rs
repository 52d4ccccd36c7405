//! Image I/O helpers shared by every adapter: MIME detection, reference-image
//! loading, and the save/download primitives each provider composes.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::utils::http::send_checked_bytes;
use crate::{PixgenError, Result};

/// Extension-based MIME lookup, case-insensitive, `image/png` fallback.
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(OsStr::to_str)
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

/// A reference image loaded from disk, base64-encoded for inline transport.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub mime: &'static str,
    pub data: String,
}

impl ReferenceImage {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data)
    }
}

pub async fn load_reference_images(paths: &[PathBuf]) -> Result<Vec<ReferenceImage>> {
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path).await?;
        out.push(ReferenceImage {
            mime: mime_from_path(path),
            data: BASE64.encode(&bytes),
        });
    }
    Ok(out)
}

pub fn compose_prompt(prompt: &str, negative: Option<&str>) -> String {
    match negative.map(str::trim).filter(|n| !n.is_empty()) {
        Some(negative) => format!("{prompt} Avoid: {negative}"),
        None => prompt.to_string(),
    }
}

pub async fn save_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

pub async fn save_base64(path: &Path, data: &str) -> Result<()> {
    let bytes = BASE64
        .decode(data.trim())
        .map_err(|err| PixgenError::InvalidResponse(format!("invalid base64 image data: {err}")))?;
    save_bytes(path, &bytes).await
}

pub async fn download_to(http: &reqwest::Client, url: &str, path: &Path) -> Result<()> {
    let bytes = send_checked_bytes(http.get(url)).await?;
    save_bytes(path, &bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_detection_covers_known_extensions() {
        assert_eq!(mime_from_path(Path::new("a.png")), "image/png");
        assert_eq!(mime_from_path(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_from_path(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_from_path(Path::new("a.gif")), "image/gif");
    }

    #[test]
    fn mime_detection_falls_back_to_png() {
        assert_eq!(mime_from_path(Path::new("a.xyz")), "image/png");
        assert_eq!(mime_from_path(Path::new("no-extension")), "image/png");
    }

    #[test]
    fn data_uri_embeds_mime_and_payload() {
        let reference = ReferenceImage {
            mime: "image/jpeg",
            data: "AQID".to_string(),
        };
        assert_eq!(reference.data_uri(), "data:image/jpeg;base64,AQID");
    }

    #[tokio::test]
    async fn save_base64_writes_decoded_bytes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested/out.png");
        save_base64(&path, "AQID").await?;
        assert_eq!(std::fs::read(&path)?, vec![1, 2, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn save_base64_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let err = save_base64(&path, "not base64 !!!").await.unwrap_err();
        assert!(matches!(err, PixgenError::InvalidResponse(_)));
    }
}
