use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::HeaderMap;
use crate::http::response::StatusCode;

const HTTP_VERSION: &str = "HTTP/1.1";

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("unknown status code {0}")]
    UnknownStatusCode(u16),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializes one response onto `W`.
///
/// Calls must come in this order:
///
/// ```text
/// write_status_line -> write_headers -> write_body
///                                    \-> write_chunked_body* -> write_chunked_body_done -> [write_trailers]
/// ```
///
/// The order is not checked; bytes go out exactly as the calls are made.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    sink: W,
    status_written: bool,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            status_written: false,
        }
    }

    /// Whether a status line has gone out, i.e. the response has started.
    pub fn status_written(&self) -> bool {
        self.status_written
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    pub async fn write_status_line(&mut self, status: impl Into<StatusCode>) -> Result<(), WriteError> {
        let status = status.into();
        let reason = status
            .reason_phrase()
            .ok_or(WriteError::UnknownStatusCode(status.as_u16()))?;

        let line = format!("{} {} {}\r\n", HTTP_VERSION, status.as_u16(), reason);
        self.sink.write_all(line.as_bytes()).await?;
        self.status_written = true;
        Ok(())
    }

    pub async fn write_headers(&mut self, headers: &HeaderMap) -> Result<(), WriteError> {
        let mut buf = Vec::new();
        for (name, value) in headers.iter() {
            write_field(&mut buf, name, value);
        }
        buf.extend_from_slice(b"\r\n");

        self.sink.write_all(&buf).await?;
        Ok(())
    }

    /// Writes `body` verbatim. The caller owns `Content-Length` correctness.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<usize, WriteError> {
        self.sink.write_all(body).await?;
        Ok(body.len())
    }

    /// Writes `data` as one chunk. An empty slice writes nothing, since a
    /// zero-size chunk would end the body.
    pub async fn write_chunked_body(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if data.is_empty() {
            return Ok(0);
        }

        let mut buf = Vec::with_capacity(data.len() + 12);
        buf.extend_from_slice(format!("{:X}\r\n", data.len()).as_bytes());
        buf.extend_from_slice(data);
        buf.extend_from_slice(b"\r\n");

        self.sink.write_all(&buf).await?;
        Ok(buf.len())
    }

    /// Writes the last-chunk marker `0\r\n`.
    pub async fn write_chunked_body_done(&mut self) -> Result<usize, WriteError> {
        self.sink.write_all(b"0\r\n").await?;
        Ok(3)
    }

    /// Writes every field named in `headers`' `Trailer` value, then the
    /// blank line that ends the message.
    ///
    /// A declared trailer with no value in `headers` is written empty.
    pub async fn write_trailers(&mut self, headers: &HeaderMap) -> Result<(), WriteError> {
        let declared = headers.get("Trailer").unwrap_or("");

        let mut buf = Vec::new();
        for name in declared.split(", ").filter(|name| !name.is_empty()) {
            write_field(&mut buf, name, headers.get(name).unwrap_or(""));
        }
        buf.extend_from_slice(b"\r\n");

        self.sink.write_all(&buf).await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), WriteError> {
        self.sink.flush().await?;
        Ok(())
    }
}

fn write_field(buf: &mut Vec<u8>, name: &str, value: &str) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}
