//! Error types for the cirrus transport and pagination core.
//!
//! All fallible operations return `Result<T, CirrusError>`.
//! Shape definition problems are reported separately as [`ShapeError`]
//! so they can be surfaced at registration time.

use std::time::Duration;
use thiserror::Error;

/// Boxed error carried by pagination failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The canonical error type for cirrus.
#[derive(Debug, Error)]
pub enum CirrusError {
    // ── Request Construction ─────────────────────────────────────
    /// The endpoint URL is missing a scheme or a host.
    #[error("malformed url: {0}")]
    MalformedUrl(String),

    // ── Response Protocol ────────────────────────────────────────
    /// A response head arrived out of order, or the response ended
    /// before any head was seen.
    #[error("malformed response head")]
    MalformedHead,

    /// Response body bytes arrived before any head.
    #[error("malformed response body")]
    MalformedBody,

    // ── Connection Errors ────────────────────────────────────────
    /// DNS resolution, TCP connect or socket I/O failed.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// TCP connection establishment exceeded its deadline.
    #[error("connect timeout after {0:?}")]
    ConnectTimeout(Duration),

    /// The TLS handshake or TLS configuration failed.
    #[error("tls error: {0}")]
    Tls(String),

    /// The peer closed the connection before the response was complete.
    #[error("connection closed before response completed")]
    ConnectionClosed,

    // ── Pagination ───────────────────────────────────────────────
    /// A pagination sequence was aborted by a failing page.
    #[error("pagination failed on page {page} ({stage}): {source}")]
    Pagination {
        page: usize,
        stage: PageStage,
        #[source]
        source: BoxError,
    },

    // ── Shapes and Codec ─────────────────────────────────────────
    /// A shape's directive list violates the placement rules.
    #[error("invalid shape: {0}")]
    Shape(#[from] ShapeError),

    /// A shape could not be turned into wire fragments.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A response could not be turned back into a shape.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// The backend answered with an error status.
    #[error("service error {status}: {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    // ── Scheduling ───────────────────────────────────────────────
    /// Work was submitted to a worker pool that has been closed.
    #[error("worker pool is closed")]
    PoolClosed,

    /// A spawned task panicked or was dropped before finishing.
    #[error("task failed: {0}")]
    Task(String),
}

impl CirrusError {
    /// Returns `true` for failures raised while establishing a connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::ConnectTimeout(_) | Self::Tls(_) | Self::ConnectionClosed
        )
    }
}

/// Where in a page cycle a pagination failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStage {
    /// The command for the page failed.
    Command,
    /// The page callback failed.
    OnPage,
}

impl std::fmt::Display for PageStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command => write!(f, "command"),
            Self::OnPage => write!(f, "on_page"),
        }
    }
}

// ── ShapeError ───────────────────────────────────────────────────

/// Definition-time violation of the member placement rules.
///
/// These are never produced per call: a shape either registers
/// cleanly or it is rejected once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// A member was declared with an empty label or location name.
    #[error("{shape}: member label and location names must be non-empty")]
    EmptyName { shape: &'static str },

    /// Two members share the same wire label.
    #[error("{shape}: duplicate member label `{label}`")]
    DuplicateLabel {
        shape: &'static str,
        label: &'static str,
    },

    /// More than one member claims to be the raw payload.
    #[error("{shape}: more than one blob member (`{first}`, `{second}`)")]
    MultipleBlobs {
        shape: &'static str,
        first: &'static str,
        second: &'static str,
    },

    /// A structured body member coexists with a blob payload.
    #[error("{shape}: body member `{body}` cannot coexist with blob member `{blob}`")]
    BodyWithBlob {
        shape: &'static str,
        body: &'static str,
        blob: &'static str,
    },

    /// A status code member was declared on a request shape.
    #[error("{shape}: status code member `{label}` on a request shape")]
    StatusCodeOnRequest {
        shape: &'static str,
        label: &'static str,
    },

    /// A status code member does not hold an integer.
    #[error("{shape}: status code member `{label}` is not an integer")]
    StatusCodeNotInteger {
        shape: &'static str,
        label: &'static str,
    },
}

// ── Convenient From implementations ──────────────────────────────

impl From<serde_json::Error> for CirrusError {
    fn from(e: serde_json::Error) -> Self {
        CirrusError::Decoding(e.to_string())
    }
}

impl From<tokio::task::JoinError> for CirrusError {
    fn from(e: tokio::task::JoinError) -> Self {
        CirrusError::Task(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = CirrusError::MalformedUrl("localhost".into());
        assert!(e.to_string().contains("localhost"));

        let e = CirrusError::Service {
            status: 400,
            code: "InvalidAction".into(),
            message: "You didn't mean that".into(),
        };
        assert!(e.to_string().contains("400"));
        assert!(e.to_string().contains("InvalidAction"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let e: CirrusError = io_err.into();
        assert!(matches!(e, CirrusError::Connection(_)));
        assert!(e.is_connection_error());
    }

    #[test]
    fn pagination_keeps_source() {
        let inner = CirrusError::MalformedHead;
        let e = CirrusError::Pagination {
            page: 2,
            stage: PageStage::Command,
            source: Box::new(inner),
        };
        assert!(e.to_string().contains("page 2"));
        let source = std::error::Error::source(&e).unwrap();
        assert!(source.downcast_ref::<CirrusError>().is_some());
    }

    #[test]
    fn shape_error_converts() {
        let e: CirrusError = ShapeError::DuplicateLabel {
            shape: "ListInput",
            label: "Token",
        }
        .into();
        assert!(matches!(e, CirrusError::Shape(_)));
        assert!(!e.is_connection_error());
    }
}
