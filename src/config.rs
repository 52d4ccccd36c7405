use crate::{PixgenError, Result};

pub(crate) fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolves the first non-empty env var among `keys`. Missing credentials are
/// a fail-fast configuration error raised at provider construction, before
/// any network call.
pub(crate) fn require_env_any(keys: &[&str]) -> Result<String> {
    for key in keys {
        if let Some(value) = env_nonempty(key) {
            return Ok(value);
        }
    }
    Err(PixgenError::Config(format!(
        "missing api credential (set {})",
        keys.join(" or ")
    )))
}
