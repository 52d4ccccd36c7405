//! Flattens a (typically transparent) image onto a solid background color.

use std::path::Path;

use image::{DynamicImage, Rgba, RgbaImage};

use crate::{PixgenError, Result};

pub fn parse_hex_color(hex: &str) -> Result<[u8; 3]> {
    let raw = hex.trim().trim_start_matches('#');
    if raw.len() != 6 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PixgenError::PostProcess(format!(
            "invalid background color '{hex}' (expected hex like #1a2b3c)"
        )));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&raw[range], 16).expect("validated hex digits")
    };
    Ok([channel(0..2), channel(2..4), channel(4..6)])
}

/// Composites the image over a solid color and saves it in place. JPEG output
/// drops the alpha channel since the format cannot carry it.
pub fn apply_background(path: &Path, hex: &str) -> Result<()> {
    let [r, g, b] = parse_hex_color(hex)?;
    let source = image::open(path)?.to_rgba8();

    let mut canvas = RgbaImage::from_pixel(source.width(), source.height(), Rgba([r, g, b, 255]));
    image::imageops::overlay(&mut canvas, &source, 0, 0);

    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false);
    if is_jpeg {
        DynamicImage::ImageRgba8(canvas).to_rgb8().save(path)?;
    } else {
        canvas.save(path)?;
    }
    Ok(())
}
