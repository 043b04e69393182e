use std::io::BufRead;

use crate::error::ParseError;
use crate::method::Method;
use crate::pool::Pools;
use crate::request::Request;
use crate::version::Version;

/// Reads one HTTP/1.x request head (and bounded body) from a buffered byte
/// reader into a pooled `Request` (spec §4.B).
///
/// On any error after the request shell has been acquired from `pools`, the
/// shell and its header map/body buffer are returned to their pools before
/// the error propagates — callers never leak a half-built request.
pub fn parse_request<R: BufRead>(
    reader: &mut R,
    pools: &Pools,
    max_body_size: usize,
) -> Result<Request, ParseError> {
    let mut request = pools.get_request();
    match parse_into(reader, &mut request, max_body_size) {
        Ok(()) => Ok(request),
        Err(err) => {
            pools.put_request(request);
            Err(err)
        }
    }
}

fn parse_into<R: BufRead>(
    reader: &mut R,
    request: &mut Request,
    max_body_size: usize,
) -> Result<(), ParseError> {
    let mut line = Vec::new();
    let n = reader.read_until(b'\n', &mut line)?;
    if n == 0 {
        return Err(ParseError::EndOfStream);
    }

    let (method, path, version) = parse_request_line(&line)?;
    request.method = method;
    request.path = path;
    request.version = version;

    parse_headers(reader, &mut request.headers)?;

    read_body(reader, &request.headers, max_body_size, &mut request.body)?;

    Ok(())
}

fn trim_line(bytes: &[u8]) -> &[u8] {
    let mut end = bytes.len();
    while end > 0 && (bytes[end - 1] == b'\n' || bytes[end - 1] == b'\r') {
        end -= 1;
    }
    &bytes[..end]
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let mut start = 0;
    let mut end = bytes.len();
    while start < end && bytes[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    &bytes[start..end]
}

fn parse_request_line(line: &[u8]) -> Result<(Method, String, Version), ParseError> {
    let line = trim_line(line);
    let fields: Vec<&[u8]> = line.split(|&b| b == b' ').collect();
    if fields.len() != 3 {
        return Err(ParseError::MalformedRequestLine);
    }

    let method = Method::parse(trim_ascii_whitespace(fields[0]))
        .ok_or(ParseError::MalformedRequestLine)?;
    let path = std::str::from_utf8(trim_ascii_whitespace(fields[1]))
        .map_err(|_| ParseError::MalformedRequestLine)?
        .to_string();
    let version =
        Version::parse(trim_ascii_whitespace(fields[2])).ok_or(ParseError::UnsupportedHttpVersion)?;

    Ok((method, path, version))
}

fn parse_headers<R: BufRead>(
    reader: &mut R,
    headers: &mut crate::request::Headers,
) -> Result<(), ParseError> {
    loop {
        let mut line = Vec::new();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 || line == b"\r\n" {
            break;
        }

        let trimmed = trim_line(&line);
        if let Some(colon) = trimmed.iter().position(|&b| b == b':') {
            let key = trim_ascii_whitespace(&trimmed[..colon]);
            let value = trim_ascii_whitespace(&trimmed[colon + 1..]);
            let (Ok(key), Ok(value)) = (std::str::from_utf8(key), std::str::from_utf8(value))
            else {
                continue;
            };
            headers.insert(key.to_string(), value.to_string());
        }
        // Missing colon: skip the line, lenient per spec.
    }
    Ok(())
}

/// Reads the request body directly into `body` — the pooled buffer the
/// caller acquired for this request — rather than allocating a fresh
/// `Vec` (spec §4.B: "read exactly that many bytes into a pooled buffer").
fn read_body<R: BufRead>(
    reader: &mut R,
    headers: &crate::request::Headers,
    max_body_size: usize,
    body: &mut Vec<u8>,
) -> Result<(), ParseError> {
    let Some(raw_len) = headers.get("Content-Length") else {
        return Ok(());
    };

    let len: i64 = raw_len
        .trim()
        .parse()
        .map_err(|_| ParseError::MalformedContentLength)?;
    if len < 0 {
        return Err(ParseError::MalformedContentLength);
    }
    let len = len as usize;
    if len == 0 {
        return Ok(());
    }
    if len > max_body_size {
        return Err(ParseError::RequestBodyTooLarge);
    }

    body.resize(len, 0);
    reader.read_exact(body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pools() -> Pools {
        Pools::new(16)
    }

    #[test]
    fn parses_request_line_headers_and_body() {
        let raw = b"POST /api/users HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhello";
        let mut cursor = Cursor::new(raw.to_vec());
        let req = parse_request(&mut cursor, &pools(), 1024).unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.path, "/api/users");
        assert_eq!(req.version, Version::Http11);
        assert_eq!(req.headers.get("Host").map(String::as_str), Some("x"));
        assert_eq!(req.body, b"hello");
    }

    #[test]
    fn lenient_on_header_line_missing_colon() {
        let raw = b"GET / HTTP/1.1\r\nnotaheader\r\nHost: y\r\n\r\n";
        let mut cursor = Cursor::new(raw.to_vec());
        let req = parse_request(&mut cursor, &pools(), 1024).unwrap();
        assert_eq!(req.headers.get("Host").map(String::as_str), Some("y"));
    }

    #[test]
    fn end_of_stream_on_empty_read() {
        let mut cursor = Cursor::new(Vec::new());
        let err = parse_request(&mut cursor, &pools(), 1024).unwrap_err();
        assert!(matches!(err, ParseError::EndOfStream));
    }

    #[test]
    fn malformed_request_line_on_wrong_field_count() {
        let mut cursor = Cursor::new(b"GET /\r\n\r\n".to_vec());
        let err = parse_request(&mut cursor, &pools(), 1024).unwrap_err();
        assert!(matches!(err, ParseError::MalformedRequestLine));
    }

    #[test]
    fn unsupported_version_rejected() {
        let mut cursor = Cursor::new(b"GET / HTTP/2.0\r\n\r\n".to_vec());
        let err = parse_request(&mut cursor, &pools(), 1024).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedHttpVersion));
    }

    #[test]
    fn body_too_large_rejected() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 9\r\n\r\n123456789";
        let mut cursor = Cursor::new(raw.to_vec());
        let err = parse_request(&mut cursor, &pools(), 8).unwrap_err();
        assert!(matches!(err, ParseError::RequestBodyTooLarge));
    }

    #[test]
    fn negative_content_length_rejected() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: -1\r\n\r\n";
        let mut cursor = Cursor::new(raw.to_vec());
        let err = parse_request(&mut cursor, &pools(), 1024).unwrap_err();
        assert!(matches!(err, ParseError::MalformedContentLength));
    }

    #[test]
    fn failed_parse_returns_shell_to_pool() {
        let pools = pools();
        let mut cursor = Cursor::new(b"GET /\r\n\r\n".to_vec());
        let _ = parse_request(&mut cursor, &pools, 1024).unwrap_err();
        // A second acquire must not allocate a brand new shell if the pool
        // already returned one.
        let req = pools.get_request();
        assert!(req.path.is_empty());
    }
}
