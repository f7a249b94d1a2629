use std::fmt;

use tokio::io::AsyncWrite;

use crate::http::headers::HeaderMap;
use crate::http::writer::{ResponseWriter, WriteError};

/// HTTP status code.
///
/// Any `u16` can be held, but only the codes with a reason phrase can be
/// written to the wire:
/// - `OK` (200)
/// - `BAD_REQUEST` (400)
/// - `INTERNAL_SERVER_ERROR` (500)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use rawhttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.as_u16(), 200);
    /// assert_eq!(StatusCode::from(404u16).as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns the reason phrase, or `None` for a code the writer can't emit.
    ///
    /// # Example
    ///
    /// ```
    /// # use rawhttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::BAD_REQUEST.reason_phrase(), Some("Bad Request"));
    /// assert_eq!(StatusCode::from(418u16).reason_phrase(), None);
    /// ```
    pub fn reason_phrase(&self) -> Option<&'static str> {
        match self.0 {
            200 => Some("OK"),
            400 => Some("Bad Request"),
            500 => Some("Internal Server Error"),
            _ => None,
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl From<StatusCode> for u16 {
    fn from(status: StatusCode) -> Self {
        status.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason_phrase() {
            Some(reason) => write!(f, "{} {}", self.0, reason),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Headers every response starts from.
///
/// `Content-Length` is set to `content_length`; callers streaming a chunked
/// body delete it and set `Transfer-Encoding` instead.
pub fn default_headers(content_length: usize) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.set("Content-Length", content_length.to_string());
    headers.set("Connection", "close");
    headers.set("Content-Type", "text/plain");
    headers
}

/// An error a handler reports instead of writing its own response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct HandlerError {
    pub status: StatusCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(status: impl Into<StatusCode>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Writes this error as a complete plain-text response.
    ///
    /// A status the writer can't emit is replaced with 500.
    pub async fn write_to<W>(&self, writer: &mut ResponseWriter<W>) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        let status = if self.status.reason_phrase().is_some() {
            self.status
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        writer.write_status_line(status).await?;
        writer
            .write_headers(&default_headers(self.message.len()))
            .await?;
        writer.write_body(self.message.as_bytes()).await?;
        Ok(())
    }
}
