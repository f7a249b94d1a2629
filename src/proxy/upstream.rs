//! Minimal HTTP client used to forward requests upstream.
//!
//! Requests go out as HTTP/1.0 so the upstream answers with a plain body
//! (never chunked) that ends at `Content-Length` or connection close. The
//! body is handed back a read at a time so it can be relayed while it
//! arrives.

use anyhow::{Context, Result};
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

use crate::http::headers::{HeaderMap, find_crlf};
use crate::http::request::parse_content_length;

/// Largest piece of body returned by one [`UpstreamResponse::next_chunk`].
pub const READ_SIZE: usize = 1024;

/// Forwards GET requests to one base URL.
#[derive(Debug, Clone)]
pub struct Upstream {
    base: Url,
}

impl Upstream {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// The URL for `<base>/<path>`.
    ///
    /// `path` is appended to the base path and never resolved as a URL
    /// reference, so the scheme, host and port always come from the base.
    pub fn target_url(&self, path: &str) -> Url {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };
        let base_path = self.base.path().trim_end_matches('/');
        let sep = if path.is_empty() || path.starts_with('/') { "" } else { "/" };

        let mut url = self.base.clone();
        url.set_path(&format!("{}{}{}", base_path, sep, path));
        url.set_query(query);
        url.set_fragment(None);
        url
    }

    /// Sends `GET <base>/<path>` and returns once the status line and
    /// headers are in.
    pub async fn get(&self, path: &str) -> Result<UpstreamResponse> {
        let url = self.target_url(path);
        let host = url.host_str().context("Upstream URL missing host")?;
        let port = url.port_or_known_default().unwrap_or(80);

        let mut stream = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("Failed to connect to {}:{}", host, port))?;
        tracing::trace!(%url, "Connected to upstream");

        stream.write_all(&build_request(&url)).await?;
        stream.flush().await?;

        UpstreamResponse::read_head(stream).await
    }
}

/// Builds the request bytes for `GET url`.
///
/// Note: public for integration testing
pub fn build_request(url: &Url) -> Vec<u8> {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };

    format!(
        "GET {} HTTP/1.0\r\nHost: {}\r\nConnection: close\r\n\r\n",
        target, host
    )
    .into_bytes()
}

/// Status and headers of an upstream response, with the body still on the
/// wire.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    stream: TcpStream,
    buffered: BytesMut,
    remaining: Option<usize>,
}

impl UpstreamResponse {
    async fn read_head(mut stream: TcpStream) -> Result<Self> {
        let mut buffer = BytesMut::with_capacity(READ_SIZE);

        let status = loop {
            if let Some(end) = find_crlf(&buffer) {
                let line = buffer.split_to(end + 2);
                break parse_status_line(&line[..end])?;
            }
            read_more(&mut stream, &mut buffer).await?;
        };

        let mut headers = HeaderMap::new();
        loop {
            let (n, done) = headers
                .parse_one(&buffer)
                .context("Invalid upstream header")?;
            buffer.advance(n);
            if done {
                break;
            }
            if n == 0 {
                read_more(&mut stream, &mut buffer).await?;
            }
        }

        let remaining = match headers.get("Content-Length") {
            Some(v) => Some(parse_content_length(v).context("Invalid upstream Content-Length")?),
            None => None,
        };

        Ok(Self {
            status,
            headers,
            stream,
            buffered: buffer,
            remaining,
        })
    }

    /// Next piece of the body, at most [`READ_SIZE`] bytes, or `None` once
    /// the body is complete.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let want = match self.remaining {
            Some(0) => return Ok(None),
            Some(n) => n.min(READ_SIZE),
            None => READ_SIZE,
        };

        if self.buffered.is_empty() {
            self.buffered.reserve(want);
            let n = (&mut self.stream)
                .take(want as u64)
                .read_buf(&mut self.buffered)
                .await?;
            if n == 0 {
                if self.remaining.is_some() {
                    anyhow::bail!("Upstream closed before complete body received");
                }
                return Ok(None);
            }
        }

        let take = self.buffered.len().min(want);
        let chunk = self.buffered.split_to(take).freeze();
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= chunk.len();
        }
        Ok(Some(chunk))
    }
}

async fn read_more(stream: &mut TcpStream, buffer: &mut BytesMut) -> Result<()> {
    let n = stream.read_buf(buffer).await?;
    if n == 0 {
        anyhow::bail!("Upstream closed before complete response head received");
    }
    Ok(())
}

fn parse_status_line(line: &[u8]) -> Result<u16> {
    let line = std::str::from_utf8(line).context("Invalid UTF-8 in upstream status line")?;
    let mut parts = line.splitn(3, ' ');

    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/") {
        anyhow::bail!("Invalid upstream status line: {}", line);
    }

    parts
        .next()
        .context("Upstream status line missing code")?
        .parse()
        .with_context(|| format!("Invalid upstream status code in: {}", line))
}
