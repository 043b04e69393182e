use std::io;

use crate::status::StatusCode;

/// Parse-time failures of the wire parser (spec §4.B / §7).
#[derive(Debug)]
pub enum ParseError {
    /// Clean EOF before any byte of a new request line arrived.
    EndOfStream,
    MalformedRequestLine,
    MalformedHeader,
    MalformedContentLength,
    UnsupportedHttpVersion,
    RequestBodyTooLarge,
    Io(io::Error),
}

impl From<io::Error> for ParseError {
    fn from(err: io::Error) -> Self {
        ParseError::Io(err)
    }
}

impl ParseError {
    /// The wire status this error maps to per spec §7, or `None` when the
    /// connection closes without writing anything (`EndOfStream`).
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ParseError::EndOfStream => None,
            ParseError::UnsupportedHttpVersion => Some(StatusCode::HTTP_VERSION_NOT_SUPPORTED),
            ParseError::RequestBodyTooLarge => Some(StatusCode::PAYLOAD_TOO_LARGE),
            ParseError::MalformedRequestLine
            | ParseError::MalformedHeader
            | ParseError::MalformedContentLength
            | ParseError::Io(_) => Some(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

/// Top-level error returned by fallible, non-per-connection operations:
/// server construction and `Serve` itself.
#[derive(Debug)]
pub enum HttpError {
    Io(io::Error),
    /// Returned by `Serve` when the accept loop hits a non-timeout,
    /// non-cancellation accept error (spec §7 `AcceptFailed`).
    AcceptFailed(io::Error),
}

impl From<io::Error> for HttpError {
    fn from(err: io::Error) -> Self {
        HttpError::Io(err)
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::Io(err) => write!(f, "io error: {err}"),
            HttpError::AcceptFailed(err) => write!(f, "accept failed: {err}"),
        }
    }
}

impl std::error::Error for HttpError {}
