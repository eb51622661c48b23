//! Single-image fetch with exponential-backoff retries.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::write::write_png_atomic;

/// Download a PNG from `url` and persist it at `path`.
///
/// Attempts run `0..=max_retries`, sleeping `2^attempt` seconds before each
/// retry. Transport failures, unexpected statuses and stream copy errors are
/// retried; image decode/encode failures are not, the upstream body is
/// simply not a usable image and asking again will not change that.
///
/// With `buffer == 0` the response body is streamed to disk unchanged. With
/// `buffer > 0` the body is decoded, a centered region `buffer` pixels
/// smaller on every side is cropped out, and the crop is re-encoded as PNG,
/// so the file on disk has the dimensions the caller asked the tile to be.
pub async fn fetch_png(
    client: &Client,
    url: &str,
    path: &Path,
    buffer: u32,
    max_retries: u32,
) -> EngineResult<()> {
    let mut last_err: Option<EngineError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let wait = Duration::from_secs(1 << attempt);
            warn!(
                attempt,
                wait_secs = wait.as_secs(),
                error = %last_err.as_ref().map(ToString::to_string).unwrap_or_default(),
                "retrying fetch"
            );
            tokio::time::sleep(wait).await;
        }

        if let Some(dir) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                last_err = Some(EngineError::disk(dir, e));
                continue;
            }
        }

        let response = match client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                last_err = Some(EngineError::UpstreamTransport(e));
                continue;
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            last_err = Some(EngineError::UpstreamStatus(status.as_u16()));
            continue;
        }

        if buffer == 0 {
            match stream_to_file(response, path).await {
                Ok(()) => {
                    debug!(url, path = %path.display(), "fetched");
                    return Ok(());
                }
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            }
        }

        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                last_err = Some(EngineError::UpstreamTransport(e));
                continue;
            }
        };

        // Not retried: a malformed body will stay malformed.
        let img = image::load_from_memory(&body).map_err(EngineError::ImageDecode)?;
        let (w, h) = (img.width(), img.height());
        if w <= 2 * buffer || h <= 2 * buffer {
            return Err(EngineError::ImageTooSmall {
                got_w: w,
                got_h: h,
                want_w: 2 * buffer + 1,
                want_h: 2 * buffer + 1,
            });
        }
        let cropped = img
            .crop_imm(buffer, buffer, w - 2 * buffer, h - 2 * buffer)
            .to_rgba8();
        write_png_atomic(path, &cropped)?;
        debug!(url, path = %path.display(), "fetched and cropped");
        return Ok(());
    }

    Err(EngineError::RetriesExhausted {
        attempts: max_retries + 1,
        last: Box::new(last_err.unwrap_or(EngineError::UpstreamStatus(0))),
    })
}

/// Stream a response body into a temp sibling of `path`, then rename.
async fn stream_to_file(response: reqwest::Response, path: &Path) -> EngineResult<()> {
    let dir = path.parent().ok_or_else(|| {
        EngineError::disk(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent"),
        )
    })?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| EngineError::disk(path, e))?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(EngineError::UpstreamTransport)?;
        tmp.write_all(&chunk)
            .map_err(|e| EngineError::disk(path, e))?;
    }

    tmp.persist(path)
        .map_err(|e| EngineError::disk(path, e.error))?;
    Ok(())
}
