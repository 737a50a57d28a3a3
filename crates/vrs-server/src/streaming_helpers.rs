//! Range streaming engine: single-range parsing and chunked file serving.
//!
//! Bodies are produced lazily by `ReaderStream` over a seeked, length-limited
//! file handle, so memory stays bounded regardless of the requested span.

use std::path::Path;

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use vrs_core::media::content_type_for;

/// Read size for file bodies.
pub const STREAM_CHUNK_SIZE: usize = 1024 * 1024;

/// A parsed `Range: bytes=START-END?` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRequest {
    pub start: u64,
    /// Inclusive end; `None` means "to end of file".
    pub end: Option<u64>,
}

impl RangeRequest {
    /// Parse a single-range header value.
    ///
    /// Only `bytes=<digits>-<digits?>` is accepted; suffix ranges
    /// (`bytes=-500`) and multi-range lists are rejected.
    pub fn parse(value: &str) -> Option<Self> {
        let spec = value.strip_prefix("bytes=")?;
        let (start, end) = spec.split_once('-')?;

        let start = parse_digits(start)?;
        let end = if end.is_empty() {
            None
        } else {
            Some(parse_digits(end)?)
        };

        Some(Self { start, end })
    }

    /// Inclusive `(start, end)` bounds within a file of `file_size` bytes.
    ///
    /// `None` when `start >= size`, `end >= size` or `start > end`.
    pub fn resolve(self, file_size: u64) -> Option<(u64, u64)> {
        let end = match self.end {
            Some(end) => end,
            None => file_size.checked_sub(1)?,
        };
        if self.start >= file_size || end >= file_size || self.start > end {
            return None;
        }
        Some((self.start, end))
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Serve `path` as a full response, or as a 206 when `range_header` is set.
///
/// An unparsable or unsatisfiable range yields a bodiless 416.
pub async fn serve_file(
    path: &Path,
    range_header: Option<&str>,
) -> Result<Response, vrs_core::Error> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| vrs_core::Error::not_found("file", file_name(path)))?;
    let file_size = metadata.len();
    let content_type = content_type_for(&file_name(path));

    let Some(range_header) = range_header else {
        let file = open(path).await?;
        let body = Body::from_stream(ReaderStream::with_capacity(file, STREAM_CHUNK_SIZE));
        return Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, file_size.to_string())
            .header(header::ACCEPT_RANGES, "bytes")
            .body(body)
            .map_err(|e| vrs_core::Error::Internal(format!("Failed to build response: {e}")));
    };

    let Some((start, end)) = RangeRequest::parse(range_header).and_then(|r| r.resolve(file_size))
    else {
        tracing::debug!(range = range_header, file_size, "Unsatisfiable range request");
        return Ok(range_not_satisfiable(file_size));
    };

    let length = end - start + 1;
    let mut file = open(path).await?;
    file.seek(std::io::SeekFrom::Start(start))
        .await
        .map_err(|e| vrs_core::Error::Internal(format!("Seek failed: {e}")))?;

    let limited = file.take(length);
    let body = Body::from_stream(ReaderStream::with_capacity(limited, STREAM_CHUNK_SIZE));

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_RANGE, format!("bytes {start}-{end}/{file_size}"))
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, length.to_string())
        .body(body)
        .map_err(|e| vrs_core::Error::Internal(format!("Failed to build response: {e}")))
}

/// Serve `path` in full as a download named after its basename.
pub async fn serve_attachment(path: &Path) -> Result<Response, vrs_core::Error> {
    let mut response = serve_file(path, None).await?;
    let disposition = format!("attachment; filename=\"{}\"", ascii_file_name(path));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// Bodiless 416 response.
pub fn range_not_satisfiable(file_size: u64) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::RANGE_NOT_SATISFIABLE;
    if let Ok(value) = HeaderValue::from_str(&format!("bytes */{file_size}")) {
        response.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    response
}

async fn open(path: &Path) -> Result<tokio::fs::File, vrs_core::Error> {
    tokio::fs::File::open(path)
        .await
        .map_err(|_| vrs_core::Error::not_found("file", file_name(path)))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Header-safe rendition of the file name.
fn ascii_file_name(path: &Path) -> String {
    file_name(path)
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
