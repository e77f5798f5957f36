//! Outbound request description.
//!
//! A [`Request`] is fully assembled before it reaches the transport:
//! path placeholders are already substituted and the body is final.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::CirrusError;
use crate::headers::Headers;

// ── Method ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = CirrusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(CirrusError::Encoding(format!("unknown http method `{s}`"))),
        }
    }
}

// ── Request ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    path: String,
    headers: Headers,
    query: Vec<(String, String)>,
    body: Bytes,
}

impl Request {
    /// Create a request for `path` with no headers, query or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method,
            path: if path.is_empty() { "/".into() } else { path },
            headers: Headers::new(),
            query: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable headers, for pre-send hooks.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Request-line target: the path plus the encoded query string.
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k, false), percent_encode(v, false)))
            .collect::<Vec<_>>()
            .join("&");
        let sep = if self.path.contains('?') { '&' } else { '?' };
        format!("{}{sep}{query}", self.path)
    }
}

// ── Path expansion ───────────────────────────────────────────────

/// Substitute `{Name}` and greedy `{Name+}` placeholders in `template`.
///
/// Plain placeholders percent-encode the whole value; greedy ones keep
/// `/` separators. Every placeholder must have a substitution.
pub fn expand_path(template: &str, substitutions: &[(String, String)]) -> Result<String, CirrusError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| CirrusError::Encoding(format!("unterminated placeholder in `{template}`")))?;
        let raw = &after[..close];
        let (name, greedy) = match raw.strip_suffix('+') {
            Some(name) => (name, true),
            None => (raw, false),
        };
        let value = substitutions
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
            .ok_or_else(|| CirrusError::Encoding(format!("missing uri member `{name}`")))?;
        out.push_str(&percent_encode(value, greedy));
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// RFC 3986 percent-encoding of everything but unreserved characters.
pub(crate) fn percent_encode(value: &str, keep_slash: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            b'/' if keep_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn expands_plain_and_greedy() {
        let path = expand_path(
            "/{Bucket}/{Key+}",
            &subs(&[("Bucket", "my bucket"), ("Key", "photos/2020/a b.jpg")]),
        )
        .unwrap();
        assert_eq!(path, "/my%20bucket/photos/2020/a%20b.jpg");
    }

    #[test]
    fn plain_placeholder_encodes_slash() {
        let path = expand_path("/items/{Id}", &subs(&[("Id", "a/b")])).unwrap();
        assert_eq!(path, "/items/a%2Fb");
    }

    #[test]
    fn missing_substitution_fails() {
        let err = expand_path("/items/{Id}", &[]).unwrap_err();
        assert!(matches!(err, CirrusError::Encoding(_)));
    }

    #[test]
    fn target_appends_query() {
        let req = Request::new(Method::Get, "/list")
            .with_query("max-keys", "10")
            .with_query("prefix", "a&b");
        assert_eq!(req.target(), "/list?max-keys=10&prefix=a%26b");
        assert_eq!(Request::new(Method::Get, "").target(), "/");
    }

    #[test]
    fn method_round_trips_through_str() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!(Method::Delete.to_string(), "DELETE");
        assert!("BREW".parse::<Method>().is_err());
    }
}
