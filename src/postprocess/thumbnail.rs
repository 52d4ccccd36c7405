//! Thumbnail generation: resize with the `image` crate, with a platform
//! `sips` subprocess as fallback when the source cannot be decoded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::{PixgenError, Result};

pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;

const FALLBACK_TIMEOUT: Duration = Duration::from_secs(10);

fn thumbnail_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    path.with_file_name(format!("{stem}-thumb.{ext}"))
}

/// Writes a `<stem>-thumb.<ext>` thumbnail next to the source, longest side
/// at most `size` pixels. Returns the thumbnail path.
pub async fn make_thumbnail(path: &Path, size: u32) -> Result<PathBuf> {
    let out = thumbnail_path(path);
    match image::open(path) {
        Ok(img) => {
            img.thumbnail(size, size).save(&out)?;
            Ok(out)
        }
        Err(err) => {
            debug!(error = %err, "image decode failed, trying platform thumbnailer");
            sips_thumbnail(path, &out, size).await?;
            Ok(out)
        }
    }
}

async fn sips_thumbnail(src: &Path, dst: &Path, size: u32) -> Result<()> {
    let mut cmd = tokio::process::Command::new("sips");
    cmd.arg("-Z")
        .arg(size.to_string())
        .arg(src)
        .arg("--out")
        .arg(dst);

    let status = match tokio::time::timeout(FALLBACK_TIMEOUT, cmd.status()).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(PixgenError::PostProcess(format!(
                "thumbnail tool timed out after {}s",
                FALLBACK_TIMEOUT.as_secs()
            )));
        }
    };
    if !status.success() {
        return Err(PixgenError::PostProcess(format!(
            "thumbnail tool exited with {status}"
        )));
    }
    Ok(())
}
