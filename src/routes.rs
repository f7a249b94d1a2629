//! Demo application served by the `rawhttp` binary.
//!
//! - `/httpbin/...` streams an upstream response back chunked, with SHA-256
//!   and length trailers
//! - `/video` serves a file from disk
//! - `/yourproblem` and `/myproblem` answer 400 and 500
//! - anything else answers 200

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tokio::io::AsyncWrite;

use crate::config::RoutesConfig;
use crate::http::request::Request;
use crate::http::response::{HandlerError, StatusCode, default_headers};
use crate::http::writer::{ResponseWriter, WriteError};
use crate::proxy::upstream::Upstream;
use crate::server::handler::Handler;

pub const PAGE_OK: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>";

pub const PAGE_BAD_REQUEST: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>";

pub const PAGE_INTERNAL_SERVER_ERROR: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>";

pub struct Routes {
    upstream: Upstream,
    video_path: PathBuf,
}

impl Routes {
    pub fn new(cfg: &RoutesConfig) -> Self {
        Self {
            upstream: Upstream::new(cfg.upstream.clone()),
            video_path: cfg.video_path.clone(),
        }
    }

    async fn proxy<W>(&self, w: &mut ResponseWriter<W>, path: &str) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut upstream = match self.upstream.get(path).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, path, "Upstream request failed");
                return write_page(w, StatusCode::INTERNAL_SERVER_ERROR, PAGE_INTERNAL_SERVER_ERROR).await;
            }
        };
        tracing::debug!(status = upstream.status, path, "Upstream responded");

        let mut headers = default_headers(0);
        headers.delete("Content-Length");
        headers.set("Transfer-Encoding", "chunked");
        headers.append("Trailer", "X-Content-SHA256");
        headers.append("Trailer", "X-Content-Length");

        w.write_status_line(StatusCode::OK).await?;
        w.write_headers(&headers).await?;

        let mut hasher = Sha256::new();
        let mut total = 0usize;
        loop {
            match upstream.next_chunk().await {
                Ok(Some(chunk)) => {
                    hasher.update(&chunk);
                    total += chunk.len();
                    w.write_chunked_body(&chunk).await?;
                }
                Ok(None) => break,
                Err(e) => {
                    // the status line is out; finish the framing with what we have
                    tracing::warn!(error = %e, path, "Upstream body ended early");
                    break;
                }
            }
        }
        w.write_chunked_body_done().await?;

        headers.set("X-Content-SHA256", format!("{:x}", hasher.finalize()));
        headers.set("X-Content-Length", total.to_string());
        w.write_trailers(&headers).await?;
        Ok(())
    }

    async fn video<W>(&self, w: &mut ResponseWriter<W>) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let contents = match tokio::fs::read(&self.video_path).await {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(error = %e, path = %self.video_path.display(), "Failed to read video");
                return write_page(w, StatusCode::INTERNAL_SERVER_ERROR, PAGE_INTERNAL_SERVER_ERROR).await;
            }
        };

        let mut headers = default_headers(contents.len());
        headers.set("Content-Type", "video/mp4");

        w.write_status_line(StatusCode::OK).await?;
        w.write_headers(&headers).await?;
        w.write_body(&contents).await?;
        Ok(())
    }
}

impl Handler for Routes {
    async fn handle<W>(&self, w: &mut ResponseWriter<W>, request: &Request) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let target = request.target();

        let written = if let Some(rest) = target.strip_prefix("/httpbin") {
            self.proxy(w, rest).await
        } else if target.starts_with("/video") {
            self.video(w).await
        } else if target.starts_with("/yourproblem") {
            write_page(w, StatusCode::BAD_REQUEST, PAGE_BAD_REQUEST).await
        } else if target.starts_with("/myproblem") {
            write_page(w, StatusCode::INTERNAL_SERVER_ERROR, PAGE_INTERNAL_SERVER_ERROR).await
        } else {
            write_page(w, StatusCode::OK, PAGE_OK).await
        };

        written.map_err(|e| HandlerError::internal(e.to_string()))
    }
}

async fn write_page<W>(w: &mut ResponseWriter<W>, status: StatusCode, page: &str) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut headers = default_headers(page.len());
    headers.set("Content-Type", "text/html");

    w.write_status_line(status).await?;
    w.write_headers(&headers).await?;
    w.write_body(page.as_bytes()).await?;
    Ok(())
}
