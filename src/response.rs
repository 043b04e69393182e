use std::io::{self, Write};

use crate::request::Headers;
use crate::status::StatusCode;
use crate::version::Version;

const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Mutable staging object handlers write their response into. Recycled
/// through the server's pool between requests (spec §4.C).
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: Headers,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub(crate) fn new() -> Self {
        Self {
            status: None,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Records the status code for this response. Treated as `200 OK` if
    /// never called.
    pub fn set_status(&mut self, code: StatusCode) {
        self.status = Some(code);
    }

    /// Upserts a header. Case-sensitive, last write wins.
    pub fn set_header(&mut self, key: &str, value: &str) {
        self.headers.insert(key.to_string(), value.to_string());
    }

    /// Appends to the body buffer. Always returns the full length of
    /// `bytes` — writes never partially fail before flush.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        self.body.extend_from_slice(bytes);
        bytes.len()
    }

    pub(crate) fn reset(&mut self) {
        self.status = None;
        self.headers.clear();
        self.body.clear();
    }

    /// Whether a given header has been set by the handler so far (pre-flush;
    /// does not reflect the `Content-Type`/`Content-Length` defaults that
    /// `flush` injects).
    pub fn has_header(&self, key: &str) -> bool {
        self.headers.contains_key(key)
    }

    pub(crate) fn set_headers(&mut self, headers: Headers) {
        self.headers = headers;
    }

    pub(crate) fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }

    /// Takes the header map and body buffer out, leaving empty ones behind,
    /// so the pool can return each to its own free-list.
    pub(crate) fn take_buffers(&mut self) -> (Headers, Vec<u8>) {
        (std::mem::take(&mut self.headers), std::mem::take(&mut self.body))
    }

    /// Serializes the staged response to `sink` per spec §4.C:
    /// status line (echoing the request's HTTP version), headers with
    /// defaults injected, a blank line, then the body.
    pub(crate) fn flush<W: Write>(&mut self, sink: &mut W, version: Version) -> io::Result<()> {
        let code = self.status.unwrap_or(StatusCode::OK);

        if !self.headers.contains_key("Content-Type") {
            self.headers
                .insert("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string());
        }
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());

        let mut out = Vec::with_capacity(self.body.len() + 256);
        write!(out, "{} {} {}\r\n", version, code, code.reason())?;
        for (key, value) in &self.headers {
            write!(out, "{key}: {value}\r\n")?;
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);

        sink.write_all(&out)?;
        sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_status_to_200_and_injects_content_type() {
        let mut w = ResponseWriter::new();
        w.write(b"hi");
        let mut out = Vec::new();
        w.flush(&mut out, Version::Http11).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(text.ends_with("hi"));
    }

    #[test]
    fn does_not_overwrite_a_handler_set_content_type() {
        let mut w = ResponseWriter::new();
        w.set_status(StatusCode::CREATED);
        w.set_header("Content-Type", "application/json");
        w.write(b"{}");
        let mut out = Vec::new();
        w.flush(&mut out, Version::Http11).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(!text.contains("text/plain"));
    }

    #[test]
    fn content_length_always_overrides_user_value() {
        let mut w = ResponseWriter::new();
        w.set_header("Content-Length", "999");
        w.write(b"abc");
        let mut out = Vec::new();
        w.flush(&mut out, Version::Http11).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Content-Length: 3\r\n"));
    }

    #[test]
    fn reset_clears_everything() {
        let mut w = ResponseWriter::new();
        w.set_status(StatusCode::NOT_FOUND);
        w.set_header("X-Foo", "bar");
        w.write(b"data");
        w.reset();
        assert_eq!(w.status, None);
        assert!(w.headers.is_empty());
        assert!(w.body.is_empty());
    }
}
