mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Result, bail};
use reqwest::Url;

/// GETs `url` and returns the body of a `200 OK` response.
///
/// Any other status, and any request-level failure, is reported as an error
/// so the caller can treat both as a transport failure.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &Url) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.clone());

    let resp = client.execute(req).await?;
    let status = resp.status();
    if status != reqwest::StatusCode::OK {
        bail!("{url} returned status {status}");
    }

    Ok(resp.bytes().await?.to_vec())
}

#[cfg(test)]
pub(crate) mod scripted;
