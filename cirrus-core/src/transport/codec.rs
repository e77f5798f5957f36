//! HTTP/1.1 wire codec.
//!
//! [`HttpCodec`] writes a [`Request`] verbatim and splits the inbound byte
//! stream into [`ResponseEvent`]s. Framing is decided from the response
//! head: `Content-Length`, `Transfer-Encoding: chunked`, or read until the
//! peer closes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::CirrusError;
use crate::headers::Headers;
use crate::request::{Method, Request};
use crate::response::ResponseHead;

/// Largest head (status line + headers) accepted before giving up.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Fixed `User-Agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str = "cirrus-sdk-rust-core";

// ── Events ───────────────────────────────────────────────────────

/// One step of an inbound response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    Head(ResponseHead),
    Body(Bytes),
    End,
}

// ── Framing ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// Waiting for the status line and headers.
    Head,
    /// `remaining` body bytes still expected.
    Length { remaining: usize },
    /// Chunked body, at a chunk size line.
    ChunkSize,
    /// Chunked body, `remaining` bytes of the current chunk expected.
    ChunkData { remaining: usize },
    /// CRLF after a chunk's data.
    ChunkDataEnd,
    /// Optional trailers after the last chunk.
    Trailers,
    /// Body runs until the peer closes.
    UntilClose,
    /// Body complete; `End` not yet emitted.
    Finished,
    /// `End` emitted; anything further is ignored.
    Done,
}

/// Codec for one request/response exchange.
#[derive(Debug)]
pub struct HttpCodec {
    method: Method,
    framing: Framing,
}

impl HttpCodec {
    /// `method` is the request method; `HEAD` responses carry no body.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            framing: Framing::Head,
        }
    }

    fn decode_head(&mut self, src: &mut BytesMut) -> Result<Option<ResponseEvent>, CirrusError> {
        let parsed = loop {
            let Some(end) = find_header_end(src) else {
                if src.len() > MAX_HEAD_SIZE {
                    return Err(CirrusError::MalformedHead);
                }
                return Ok(None);
            };

            let raw = src.split_to(end + 4);
            let parsed = parse_head(&raw[..end]).ok_or(CirrusError::MalformedHead)?;

            // Interim responses precede the final one.
            if (100..200).contains(&parsed.head.status) && parsed.head.status != 101 {
                tracing::trace!(status = parsed.head.status, "interim response skipped");
                continue;
            }
            break parsed;
        };

        let no_body = self.method == Method::Head
            || parsed.head.status == 101
            || parsed.head.status == 204
            || parsed.head.status == 304;

        self.framing = if no_body {
            Framing::Finished
        } else if parsed.chunked {
            Framing::ChunkSize
        } else {
            match parsed.content_length {
                Some(0) => Framing::Finished,
                Some(n) => Framing::Length { remaining: n },
                None => Framing::UntilClose,
            }
        };

        tracing::trace!(status = parsed.head.status, framing = ?self.framing, "response head decoded");
        Ok(Some(ResponseEvent::Head(parsed.head)))
    }
}

impl tokio_util::codec::Decoder for HttpCodec {
    type Item = ResponseEvent;
    type Error = CirrusError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.framing {
                Framing::Head => return self.decode_head(src),
                Framing::Length { remaining } => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let n = remaining.min(src.len());
                    let chunk = src.split_to(n).freeze();
                    self.framing = match remaining - n {
                        0 => Framing::Finished,
                        remaining => Framing::Length { remaining },
                    };
                    return Ok(Some(ResponseEvent::Body(chunk)));
                }
                Framing::ChunkSize => {
                    let Some(crlf) = find_crlf(src) else {
                        return Ok(None);
                    };
                    let size = parse_chunk_size(&src[..crlf]).ok_or(CirrusError::MalformedBody)?;
                    src.advance(crlf + 2);
                    self.framing = if size == 0 {
                        Framing::Trailers
                    } else {
                        Framing::ChunkData { remaining: size }
                    };
                }
                Framing::ChunkData { remaining } => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let n = remaining.min(src.len());
                    let chunk = src.split_to(n).freeze();
                    self.framing = match remaining - n {
                        0 => Framing::ChunkDataEnd,
                        remaining => Framing::ChunkData { remaining },
                    };
                    return Ok(Some(ResponseEvent::Body(chunk)));
                }
                Framing::ChunkDataEnd => {
                    if src.len() < 2 {
                        return Ok(None);
                    }
                    if &src[..2] != b"\r\n" {
                        return Err(CirrusError::MalformedBody);
                    }
                    src.advance(2);
                    self.framing = Framing::ChunkSize;
                }
                Framing::Trailers => {
                    if src.starts_with(b"\r\n") {
                        src.advance(2);
                    } else if let Some(end) = find_header_end(src) {
                        // Trailers are dropped.
                        src.advance(end + 4);
                    } else {
                        return Ok(None);
                    }
                    self.framing = Framing::Finished;
                }
                Framing::UntilClose => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let chunk = src.split().freeze();
                    return Ok(Some(ResponseEvent::Body(chunk)));
                }
                Framing::Finished => {
                    self.framing = Framing::Done;
                    return Ok(Some(ResponseEvent::End));
                }
                Framing::Done => {
                    src.clear();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(event) = self.decode(src)? {
            return Ok(Some(event));
        }
        match self.framing {
            Framing::UntilClose => {
                self.framing = Framing::Done;
                Ok(Some(ResponseEvent::End))
            }
            Framing::Done => Ok(None),
            _ => Err(CirrusError::ConnectionClosed),
        }
    }
}

impl tokio_util::codec::Encoder<Request> for HttpCodec {
    type Error = CirrusError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        for (name, value) in item.headers().iter() {
            check_header(name, value)?;
        }
        let target = item.target();
        dst.reserve(64 + target.len() + item.body().len());

        dst.put_slice(item.method().as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(target.as_bytes());
        dst.put_slice(b" HTTP/1.1\r\n");
        for (name, value) in item.headers().iter() {
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        dst.put_slice(item.body());
        Ok(())
    }
}

/// Reject header text that would break the request framing.
fn check_header(name: &str, value: &str) -> Result<(), CirrusError> {
    let bad_name = name.is_empty()
        || name
            .bytes()
            .any(|b| b == b':' || b == 0 || b.is_ascii_whitespace() || b.is_ascii_control());
    if bad_name {
        return Err(CirrusError::Encoding(format!("invalid header name {name:?}")));
    }
    if value.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(CirrusError::Encoding(format!("invalid value for header `{name}`")));
    }
    Ok(())
}

// ── Fixed headers ────────────────────────────────────────────────

/// Overwrite the headers every request must carry.
///
/// Runs after pre-send hooks, so these values always win.
pub fn apply_fixed_headers(request: &mut Request, host_header: &str, user_agent: &str) {
    let content_length = request.body().len().to_string();
    let headers = request.headers_mut();
    headers.replace_or_add("Host", host_header);
    headers.replace_or_add("User-Agent", user_agent);
    headers.replace_or_add("Accept", "*/*");
    headers.replace_or_add("Content-Length", content_length);
    headers.replace_or_add("Connection", "close");
}

// ── Head parsing ─────────────────────────────────────────────────

struct ParsedHead {
    head: ResponseHead,
    content_length: Option<usize>,
    chunked: bool,
}

/// Index of the first `\r` of `\r\n\r\n`.
fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

fn parse_head(data: &[u8]) -> Option<ParsedHead> {
    let text = std::str::from_utf8(data).ok()?;
    let mut lines = text.split("\r\n");

    let mut status_line = lines.next()?.splitn(3, ' ');
    let version = status_line.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    let status: u16 = status_line.next()?.parse().ok()?;
    if !(100..1000).contains(&status) {
        return None;
    }
    let reason = status_line.next().unwrap_or_default().to_string();

    let mut headers = Headers::new();
    let mut content_length = None;
    let mut chunked = false;
    for line in lines {
        let (name, value) = line.split_once(':')?;
        let (name, value) = (name.trim(), value.trim());
        if name.eq_ignore_ascii_case("content-length") {
            content_length = Some(value.parse().ok()?);
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            chunked = value
                .rsplit(',')
                .next()
                .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"));
        }
        headers.append(name, value);
    }

    Some(ParsedHead {
        head: ResponseHead {
            status,
            reason,
            headers,
        },
        content_length,
        chunked,
    })
}

/// Hex chunk size, ignoring `;ext=value` extensions.
fn parse_chunk_size(line: &[u8]) -> Option<usize> {
    let line = std::str::from_utf8(line).ok()?;
    let hex = line.split(';').next()?.trim();
    usize::from_str_radix(hex, 16).ok()
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::codec::{Decoder, Encoder};

    fn drain(codec: &mut HttpCodec, buf: &mut BytesMut) -> Vec<ResponseEvent> {
        let mut events = Vec::new();
        while let Some(ev) = codec.decode(buf).unwrap() {
            events.push(ev);
        }
        events
    }

    fn body_of(events: &[ResponseEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|e| match e {
                ResponseEvent::Body(b) => Some(b.to_vec()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    #[test]
    fn content_length_response() {
        let mut codec = HttpCodec::new(Method::Get);
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nX-Id: 1\r\n\r\nhello"[..]);
        let events = drain(&mut codec, &mut buf);

        match &events[0] {
            ResponseEvent::Head(head) => {
                assert_eq!(head.status, 200);
                assert_eq!(head.reason, "OK");
                assert_eq!(head.headers.get("x-id"), Some("1"));
            }
            other => panic!("expected head, got {other:?}"),
        }
        assert_eq!(body_of(&events), b"hello");
        assert_eq!(events.last(), Some(&ResponseEvent::End));
    }

    #[test]
    fn partial_head_waits_for_more() {
        let mut codec = HttpCodec::new(Method::Get);
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Le"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"ngth: 0\r\n\r\n");
        assert!(matches!(codec.decode(&mut buf).unwrap(), Some(ResponseEvent::Head(_))));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(ResponseEvent::End));
    }

    #[test]
    fn chunked_body_split_across_reads() {
        let wire: &[u8] = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
            4\r\nWiki\r\n5;ext=1\r\npedia\r\n0\r\nX-Trailer: t\r\n\r\n";
        let mut codec = HttpCodec::new(Method::Get);
        let mut buf = BytesMut::new();
        let mut events = Vec::new();
        for byte in wire {
            buf.put_u8(*byte);
            while let Some(ev) = codec.decode(&mut buf).unwrap() {
                events.push(ev);
            }
        }
        assert_eq!(body_of(&events), b"Wikipedia");
        assert_eq!(events.last(), Some(&ResponseEvent::End));
    }

    #[test]
    fn bad_chunk_size_is_malformed_body() {
        let mut codec = HttpCodec::new(Method::Get);
        let mut buf =
            BytesMut::from(&b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n"[..]);
        assert!(matches!(codec.decode(&mut buf).unwrap(), Some(ResponseEvent::Head(_))));
        assert!(matches!(codec.decode(&mut buf), Err(CirrusError::MalformedBody)));
    }

    #[test]
    fn read_until_close() {
        let mut codec = HttpCodec::new(Method::Get);
        let mut buf = BytesMut::from(&b"HTTP/1.0 200 OK\r\n\r\nstreamed"[..]);
        let mut events = drain(&mut codec, &mut buf);
        assert_eq!(body_of(&events), b"streamed");
        assert!(!events.contains(&ResponseEvent::End));

        events.push(codec.decode_eof(&mut buf).unwrap().unwrap());
        assert_eq!(events.last(), Some(&ResponseEvent::End));
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn no_body_statuses_and_head_requests() {
        let mut codec = HttpCodec::new(Method::Get);
        let mut buf = BytesMut::from(&b"HTTP/1.1 204 No Content\r\n\r\n"[..]);
        let events = drain(&mut codec, &mut buf);
        assert_eq!(events.len(), 2);

        let mut codec = HttpCodec::new(Method::Head);
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n"[..]);
        let events = drain(&mut codec, &mut buf);
        assert_eq!(events.last(), Some(&ResponseEvent::End));
    }

    #[test]
    fn close_mid_body_is_connection_closed() {
        let mut codec = HttpCodec::new(Method::Get);
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc"[..]);
        drain(&mut codec, &mut buf);
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(CirrusError::ConnectionClosed)
        ));
    }

    #[test]
    fn garbage_head_is_malformed() {
        let mut codec = HttpCodec::new(Method::Get);
        let mut buf = BytesMut::from(&b"SSH-2.0-OpenSSH\r\n\r\n"[..]);
        assert!(matches!(codec.decode(&mut buf), Err(CirrusError::MalformedHead)));
    }

    #[test]
    fn oversized_head_is_malformed() {
        let mut codec = HttpCodec::new(Method::Get);
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\n"[..]);
        buf.extend_from_slice(&vec![b'a'; MAX_HEAD_SIZE]);
        assert!(matches!(codec.decode(&mut buf), Err(CirrusError::MalformedHead)));
    }

    #[test]
    fn interim_response_is_skipped() {
        let mut codec = HttpCodec::new(Method::Get);
        let mut buf = BytesMut::from(
            &b"HTTP/1.1 103 Early Hints\r\nLink: </style.css>\r\n\r\n\
               HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok"[..],
        );
        let events = drain(&mut codec, &mut buf);
        match &events[0] {
            ResponseEvent::Head(head) => assert_eq!(head.status, 200),
            other => panic!("expected head, got {other:?}"),
        }
        assert_eq!(body_of(&events), b"ok");
        assert_eq!(events.last(), Some(&ResponseEvent::End));
    }

    #[test]
    fn interim_response_split_from_final_head() {
        let mut codec = HttpCodec::new(Method::Get);
        let mut buf = BytesMut::from(&b"HTTP/1.1 100 Continue\r\n\r\n"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
        buf.extend_from_slice(b"HTTP/1.1 204 No Content\r\n\r\n");
        let events = drain(&mut codec, &mut buf);
        assert!(matches!(&events[0], ResponseEvent::Head(h) if h.status == 204));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn header_injection_is_rejected() {
        let mut codec = HttpCodec::new(Method::Get);
        let mut dst = BytesMut::new();
        let req = Request::new(Method::Get, "/").with_header("x-token", "abc\r\nX-Injected: evil");
        assert!(matches!(codec.encode(req, &mut dst), Err(CirrusError::Encoding(_))));
        assert!(dst.is_empty());

        for name in ["", "bad name", "x:y", "x\ny"] {
            let req = Request::new(Method::Get, "/").with_header(name, "v");
            assert!(
                matches!(codec.encode(req, &mut dst), Err(CirrusError::Encoding(_))),
                "name {name:?} accepted"
            );
        }

        let req = Request::new(Method::Get, "/").with_header("x-nul", "a\0b");
        assert!(matches!(codec.encode(req, &mut dst), Err(CirrusError::Encoding(_))));
    }

    #[test]
    fn fixed_headers_override_caller_values() {
        let mut req = Request::new(Method::Post, "/queue")
            .with_header("x-amz-target", "Send")
            .with_header("host", "spoofed")
            .with_header("connection", "keep-alive")
            .with_body(&b"{\"a\":1}"[..]);
        apply_fixed_headers(&mut req, "localhost:8000", DEFAULT_USER_AGENT);

        let h = req.headers();
        assert_eq!(h.get("Host"), Some("localhost:8000"));
        assert_eq!(h.get("Connection"), Some("close"));
        assert_eq!(h.get("Content-Length"), Some("7"));
        assert_eq!(h.get("Accept"), Some("*/*"));
        assert_eq!(h.get_all("host").count(), 1);
        let names: Vec<&str> = h.iter().map(|(k, _)| k).collect();
        assert_eq!(
            names,
            vec!["x-amz-target", "Host", "Connection", "User-Agent", "Accept", "Content-Length"]
        );
    }

    #[test]
    fn encodes_request_line_headers_and_body() {
        let mut req = Request::new(Method::Put, "/b/k")
            .with_query("v", "1")
            .with_body(&b"data"[..]);
        apply_fixed_headers(&mut req, "example.com", "agent");

        let mut codec = HttpCodec::new(Method::Put);
        let mut dst = BytesMut::new();
        codec.encode(req, &mut dst).unwrap();
        let wire = String::from_utf8(dst.to_vec()).unwrap();
        assert!(wire.starts_with("PUT /b/k?v=1 HTTP/1.1\r\nHost: example.com\r\n"));
        assert!(wire.contains("Content-Length: 4\r\n"));
        assert!(wire.ends_with("\r\n\r\ndata"));
    }
}
