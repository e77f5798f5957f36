use bytes::Bytes;

use crate::error::CirrusError;
use crate::headers::Headers;

/// Status line and header block of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
}

impl ResponseHead {
    pub fn new(status: u16, headers: Headers) -> Self {
        Self {
            status,
            reason: String::new(),
            headers,
        }
    }
}

/// A complete HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    head: ResponseHead,
    body: Bytes,
}

impl Response {
    pub fn new(head: ResponseHead, body: Bytes) -> Self {
        Self { head, body }
    }

    /// HTTP status code (e.g. 200, 404).
    pub fn status(&self) -> u16 {
        self.head.status
    }

    /// Reason phrase from the status line.
    pub fn reason(&self) -> &str {
        &self.head.reason
    }

    pub fn headers(&self) -> &Headers {
        &self.head.headers
    }

    /// First header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.head.status)
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume the response and return the body bytes.
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<&str, CirrusError> {
        std::str::from_utf8(&self.body).map_err(|e| CirrusError::Decoding(e.to_string()))
    }
}
