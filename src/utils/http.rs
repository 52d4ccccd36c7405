use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::{PixgenError, Result};

const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

pub(crate) async fn error_body_truncated(response: reqwest::Response) -> String {
    let bytes = response.bytes().await.unwrap_or_default();
    let end = bytes.len().min(MAX_ERROR_BODY_BYTES);
    let mut body = String::from_utf8_lossy(&bytes[..end]).to_string();
    if bytes.len() > end {
        body.push_str("\n...(truncated)");
    }
    body
}

pub(crate) async fn send_checked(req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = req.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = error_body_truncated(response).await;
        return Err(PixgenError::Api { status, body });
    }
    Ok(response)
}

pub(crate) async fn send_checked_json<T: DeserializeOwned>(
    req: reqwest::RequestBuilder,
) -> Result<T> {
    let response = send_checked(req).await?;
    Ok(response.json::<T>().await?)
}

pub(crate) async fn send_checked_bytes(req: reqwest::RequestBuilder) -> Result<Bytes> {
    let response = send_checked(req).await?;
    Ok(response.bytes().await?)
}
