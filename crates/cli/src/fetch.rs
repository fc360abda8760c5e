//! Streaming HTTP downloads with progress reporting
//!
//! Shared by the vendor archive fallback and the weights downloader. One
//! file at a time, no retries; a non-2xx status or transport error is a
//! fatal [`SetupError::Download`] naming the URL.

use std::path::Path;

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use tripo_shared::{Result, SetupError};

/// Download `url` to `dest`, streaming to disk with a progress bar.
///
/// `token` is sent as a bearer Authorization header when present (needed for
/// gated Hugging Face repositories).
pub async fn download_to(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    token: Option<&str>,
) -> Result<()> {
    debug!("downloading {} -> {}", url, dest.display());

    let mut request = client.get(url);
    if let Some(token) = token {
        request = request.header("Authorization", format!("Bearer {}", token));
    }

    let response = request
        .send()
        .await
        .map_err(|e| SetupError::download(url, e.to_string()))?;
    if !response.status().is_success() {
        return Err(SetupError::download(
            url,
            format!("HTTP {}", response.status()),
        ));
    }

    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| url.to_string());

    let progress_bar = match response.content_length() {
        Some(len) => {
            let bar = ProgressBar::new(len);
            bar.set_style(
                ProgressStyle::with_template(
                    "{msg} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})"
                )
                .unwrap()
                .progress_chars("#>-"),
            );
            bar
        }
        None => {
            let bar = ProgressBar::new_spinner();
            bar.set_style(ProgressStyle::with_template("{spinner:.green} {msg} {bytes}").unwrap());
            bar
        }
    };
    progress_bar.set_message(format!("Downloading {}", file_name));

    let mut stream = response.bytes_stream();
    let mut file = tokio::fs::File::create(dest).await?;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| SetupError::download(url, e.to_string()))?;
        file.write_all(&chunk).await?;
        progress_bar.inc(chunk.len() as u64);
    }
    file.flush().await?;

    progress_bar.finish_with_message(format!("Downloaded {}", file_name));
    Ok(())
}
