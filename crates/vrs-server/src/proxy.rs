//! Remote proxy streamer: chunked pass-through of an upstream HTTP resource.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use futures::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};

use vrs_core::Error;

/// Chunk size for proxied bodies.
pub const PROXY_CHUNK_SIZE: usize = 64 * 1024;

const MAX_REDIRECTS: usize = 10;

/// Forwards remote resources to clients without buffering them.
///
/// The client has no overall timeout; long transfers are expected.
#[derive(Debug, Clone)]
pub struct RemoteProxy {
    client: reqwest::Client,
}

impl RemoteProxy {
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Stream `url` to the caller.
    ///
    /// Upstream error statuses become [`Error::Upstream`] before any body is
    /// sent, so an error page is never passed off as media.
    pub async fn open(&self, url: &str) -> Result<Response, Error> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| Error::Validation(format!("Invalid url '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Validation(format!(
                "Unsupported url scheme '{}'",
                parsed.scheme()
            )));
        }

        let content_type = self.probe_content_type(parsed.clone()).await;

        let upstream = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Error::upstream(url, None, e.to_string()))?;

        let status = upstream.status();
        if status.is_client_error() || status.is_server_error() {
            tracing::warn!(url, status = status.as_u16(), "Upstream returned error status");
            return Err(Error::upstream(
                url,
                Some(status.as_u16()),
                format!("Upstream error: {status}"),
            ));
        }

        tracing::info!(url, status = status.as_u16(), "Proxying remote resource");

        let stream = upstream.bytes_stream().map_err(std::io::Error::other);
        let reader = StreamReader::new(stream);
        let body = Body::from_stream(ReaderStream::with_capacity(reader, PROXY_CHUNK_SIZE));

        let mut response = Response::new(body);
        *response.status_mut() = StatusCode::OK;
        if let Some(value) = content_type {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        Ok(response)
    }

    /// Best-effort `HEAD` for the upstream content type.
    async fn probe_content_type(&self, url: reqwest::Url) -> Option<HeaderValue> {
        match self.client.head(url).send().await {
            Ok(resp) if resp.status().is_success() => resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok()),
            Ok(resp) => {
                tracing::debug!(status = resp.status().as_u16(), "HEAD probe rejected");
                None
            }
            Err(e) => {
                tracing::debug!("HEAD probe failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_unparsable_url() {
        let proxy = RemoteProxy::new().unwrap();
        let err = proxy.open("not a url").await.unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn rejects_non_http_scheme() {
        let proxy = RemoteProxy::new().unwrap();
        let err = proxy.open("file:///etc/passwd").await.unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_bad_gateway() {
        // Bind then drop a listener to get a port nothing is serving.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let proxy = RemoteProxy::new().unwrap();
        let err = proxy
            .open(&format!("http://127.0.0.1:{port}/clip.mp4"))
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 502);
    }
}
