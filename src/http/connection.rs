use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::http::buffer::ByteStage;
use crate::http::headers::DuplicatePolicy;
use crate::http::parser::{ParseError, RequestParser};
use crate::http::response::HandlerError;
use crate::http::writer::ResponseWriter;
use crate::server::handler::Handler;

/// Per-connection settings, copied into every connection task.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionOptions {
    pub read_buffer_size: usize,
    pub duplicate_headers: DuplicatePolicy,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            read_buffer_size: crate::http::buffer::DEFAULT_CAPACITY,
            duplicate_headers: DuplicatePolicy::Fold,
        }
    }
}

/// One accepted socket: one request in, one response out, then closed.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    options: ConnectionOptions,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, options: ConnectionOptions) -> Self {
        Self {
            stream,
            peer,
            options,
        }
    }

    pub async fn run<H: Handler>(mut self, handler: &H) -> anyhow::Result<()> {
        let parser = RequestParser::with_duplicate_policy(self.options.duplicate_headers);
        let mut stage = ByteStage::with_capacity(self.options.read_buffer_size);

        let request = match parser.read_request(&mut self.stream, &mut stage).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!(peer = %self.peer, "Connection closed without a request");
                return Ok(());
            }
            Err(ParseError::Io(e)) => return Err(e.into()),
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "Rejecting malformed request");
                let mut writer = ResponseWriter::new(&mut self.stream);
                HandlerError::bad_request(e.to_string())
                    .write_to(&mut writer)
                    .await?;
                return self.close().await;
            }
        };

        info!(
            peer = %self.peer,
            method = %request.method(),
            target = %request.target(),
            "Request received"
        );

        let mut writer = ResponseWriter::new(&mut self.stream);
        if let Err(err) = handler.handle(&mut writer, &request).await {
            if writer.status_written() {
                warn!(peer = %self.peer, error = %err, "Handler failed mid-response");
            } else {
                debug!(peer = %self.peer, error = %err, "Handler returned an error");
                err.write_to(&mut writer).await?;
            }
        }
        writer.flush().await?;

        self.close().await
    }

    async fn close(mut self) -> anyhow::Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
