//! File-to-file transforms applied after a successful generation, independent
//! of the provider that produced the image.

mod background;
mod remove_bg;
mod thumbnail;

pub use background::{apply_background, parse_hex_color};
pub use remove_bg::remove_background;
pub use thumbnail::{DEFAULT_THUMBNAIL_SIZE, make_thumbnail};
