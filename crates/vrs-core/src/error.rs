//! Unified error type for the vrstream server.
//!
//! Every fallible operation in the workspace funnels into [`Error`], which
//! carries enough context for API handlers to derive an HTTP status code via
//! [`Error::http_status`].

use std::fmt;

use crate::media::Mode;

/// Unified error type covering all failure modes in vrstream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "file", "mount").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A remote resource answered with an error status, or could not be
    /// reached at all (`status` is `None`).
    #[error("Upstream error from {url}: {message}")]
    Upstream {
        /// The remote URL that was requested.
        url: String,
        /// Upstream HTTP status, if a response was received.
        status: Option<u16>,
        /// Human-readable error description.
        message: String,
    },

    /// Persisting data to local storage failed.
    ///
    /// The display form is only the generic `context` so that file system
    /// details never reach API clients; the source is kept for logging.
    #[error("{context}")]
    WriteFailed {
        /// Generic description of the failed operation ("Upload failed").
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The external processing pipeline failed.
    #[error("Pipeline error [{mode}]: {message}")]
    Pipeline {
        /// The processing mode that was running.
        mode: Mode,
        /// Human-readable error description.
        message: String,
    },

    /// Configuration could not be loaded or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::Upstream { status, .. } => match status {
                Some(code) if (400..600).contains(code) => *code,
                _ => 502,
            },
            Error::WriteFailed { .. } => 500,
            Error::Io { .. } => 500,
            Error::Pipeline { .. } => 500,
            Error::Config(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Validation(_) => "validation_error",
            Error::Upstream { .. } => "upstream_error",
            Error::WriteFailed { .. } => "write_failed",
            Error::Io { .. } => "io_error",
            Error::Pipeline { .. } => "pipeline_error",
            Error::Config(_) => "config_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::WriteFailed`].
    pub fn write_failed(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::WriteFailed {
            context: context.into(),
            source,
        }
    }

    /// Convenience constructor for [`Error::Upstream`].
    pub fn upstream(url: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Upstream {
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Pipeline`].
    pub fn pipeline(mode: Mode, message: impl Into<String>) -> Self {
        Error::Pipeline {
            mode,
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("file", "clip.mp4");
        assert_eq!(err.to_string(), "file not found: clip.mp4");
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("Provide either file or filename".into());
        assert_eq!(
            err.to_string(),
            "Validation error: Provide either file or filename"
        );
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn upstream_uses_remote_status() {
        let err = Error::upstream("http://example.test/a.mp4", Some(404), "Upstream error");
        assert_eq!(err.http_status(), 404);

        let err = Error::upstream("http://example.test/a.mp4", Some(503), "Upstream error");
        assert_eq!(err.http_status(), 503);
    }

    #[test]
    fn upstream_unreachable_is_bad_gateway() {
        let err = Error::upstream("http://example.test", None, "connection refused");
        assert_eq!(err.http_status(), 502);

        // A non-error status can't be surfaced as-is.
        let err = Error::upstream("http://example.test", Some(200), "odd");
        assert_eq!(err.http_status(), 502);
    }

    #[test]
    fn write_failed_hides_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "/secret/path");
        let err = Error::write_failed("Upload failed", io);
        assert_eq!(err.to_string(), "Upload failed");
        assert_eq!(err.http_status(), 500);
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("/secret/path"));
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn pipeline_display() {
        let err = Error::pipeline(Mode::Anaglyph, "exit status 1");
        assert_eq!(err.to_string(), "Pipeline error [anaglyph]: exit status 1");
        assert_eq!(err.http_status(), 500);
    }
}
