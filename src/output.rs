//! Output-path templating for multi-variation runs.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

static IMAGE_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(png|jpg|jpeg|webp)$").expect("valid extension regex"));

/// Paths for `count` variations of `base`. With a single variation the base
/// path is returned unmodified; otherwise a `-v<i>` suffix is inserted before
/// the extension (`.png` assumed when the extension is not a known image
/// extension).
pub fn variation_paths(base: &Path, count: u8) -> Vec<PathBuf> {
    if count <= 1 {
        return vec![base.to_path_buf()];
    }

    let raw = base.to_string_lossy();
    let (stem, ext) = match IMAGE_EXT.find(&raw) {
        Some(found) => (&raw[..found.start()], &raw[found.start()..]),
        None => (raw.as_ref(), ".png"),
    };

    (1..=count)
        .map(|i| PathBuf::from(format!("{stem}-v{i}{ext}")))
        .collect()
}
