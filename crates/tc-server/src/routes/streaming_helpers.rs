//! Byte-range streaming: range resolution, content-type guessing, and
//! chunked file serving via `ReaderStream`.
//!
//! Every successful response is `206 Partial Content`, including requests
//! without a `Range` header, which get the whole file as `bytes 0-(S-1)/S`.

use std::path::Path;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tc_core::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// Bytes read from disk per body chunk.
pub const STREAM_CHUNK_SIZE: usize = 1024 * 1024;

/// An inclusive byte range within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered. Never zero, since `start <= end`.
    pub(crate) fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for a resource of `size` bytes.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{size}", self.start, self.end)
    }
}

/// Resolve an optional `Range` header against a resource of `size` bytes.
///
/// `bytes=START-END`: a missing start means 0 and a missing end means
/// `size - 1`. The result must satisfy `start <= end < size`. Anything that
/// does not parse as two non-negative integers is unsatisfiable. A header
/// without the `bytes=` unit is ignored.
pub fn resolve_range(range_header: Option<&str>, size: u64) -> Result<ByteRange, Error> {
    let unsatisfiable = || Error::RangeNotSatisfiable { size };
    let last = size.checked_sub(1).ok_or_else(unsatisfiable)?;

    let Some(value) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return Ok(ByteRange { start: 0, end: last });
    };

    let (start_str, end_str) = value.split_once('-').ok_or_else(unsatisfiable)?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    let start = if start_str.is_empty() {
        0
    } else {
        start_str.parse::<u64>().map_err(|_| unsatisfiable())?
    };
    let end = if end_str.is_empty() {
        last
    } else {
        end_str.parse::<u64>().map_err(|_| unsatisfiable())?
    };

    if start > end || end > last {
        return Err(unsatisfiable());
    }

    Ok(ByteRange { start, end })
}

/// Guess the MIME type from the file extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "ts" => "video/mp2t",
        "wmv" => "video/x-ms-wmv",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// Stream `[start, end]` of `file_path` as a partial-content response.
///
/// The file handle is owned by the body stream, so it is closed when the
/// stream finishes, errors, or is dropped because the client went away.
pub async fn serve_range(file_path: &Path, range_header: Option<&str>) -> Result<Response, Error> {
    let metadata = match tokio::fs::metadata(file_path).await {
        Ok(m) if m.is_file() => m,
        _ => return Err(Error::not_found("file", file_path.display())),
    };
    let file_size = metadata.len();

    let range = resolve_range(range_header, file_size)?;
    let length = range.len();

    let mut file = tokio::fs::File::open(file_path)
        .await
        .map_err(|_| Error::not_found("file", file_path.display()))?;
    file.seek(std::io::SeekFrom::Start(range.start)).await?;

    let stream = ReaderStream::with_capacity(file.take(length), STREAM_CHUNK_SIZE);
    let body = Body::from_stream(stream);

    tracing::debug!(
        "Streaming {} bytes {}-{} of {}",
        file_path.display(),
        range.start,
        range.end,
        file_size
    );

    Ok((
        StatusCode::PARTIAL_CONTENT,
        [
            (header::CONTENT_TYPE, guess_content_type(file_path).to_string()),
            (header::CONTENT_RANGE, range.content_range(file_size)),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        body,
    )
        .into_response())
}
