use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::ServerConfig;
use crate::http::connection::{Connection, ConnectionOptions};
use crate::server::handler::Handler;
use crate::server::workers::Workers;

/// A running server.
///
/// The accept loop runs in the background from the moment
/// [`serve`](Self::serve) returns until [`close`](Self::close).
pub struct Server {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
    workers: Workers,
}

impl Server {
    /// Listens on every interface at `port` with default options.
    pub async fn serve<H: Handler>(port: u16, handler: H) -> anyhow::Result<Self> {
        let cfg = ServerConfig {
            port,
            ..ServerConfig::default()
        };
        Self::bind(&cfg, handler).await
    }

    pub async fn bind<H: Handler>(cfg: &ServerConfig, handler: H) -> anyhow::Result<Self> {
        let addr = format!("{}:{}", cfg.host, cfg.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to listen on {}", addr))?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);

        let options = ConnectionOptions {
            read_buffer_size: cfg.read_buffer_size,
            duplicate_headers: cfg.duplicate_headers,
        };
        let (shutdown, shutdown_rx) = watch::channel(false);
        let workers = Workers::new();

        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::new(handler),
            options,
            workers.clone(),
            shutdown_rx,
        ));

        Ok(Self {
            local_addr,
            shutdown,
            accept_task,
            workers,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connections accepted and not yet closed.
    pub fn active_connections(&self) -> usize {
        self.workers.active()
    }

    /// Stops accepting and closes the listening socket.
    ///
    /// Connections already accepted keep running to completion.
    pub async fn close(self) -> anyhow::Result<()> {
        self.shutdown.send_replace(true);
        self.accept_task
            .await
            .context("Accept loop panicked")?;

        info!(
            in_flight = self.workers.active(),
            "Listener closed on {}", self.local_addr
        );
        Ok(())
    }
}

async fn accept_loop<H: Handler>(
    listener: TcpListener,
    handler: Arc<H>,
    options: ConnectionOptions,
    workers: Workers,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            // also fires if the Server was dropped
            _ = shutdown.changed() => break,

            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        if *shutdown.borrow() {
                            break;
                        }
                        warn!(error = %e, "Accept failed");
                        continue;
                    }
                };
                debug!("Accepted connection from {}", peer);

                let handler = Arc::clone(&handler);
                let conn = Connection::new(socket, peer, options);
                workers.submit(
                    async move {
                        if let Err(e) = conn.run(handler.as_ref()).await {
                            tracing::error!("Connection error from {}: {}", peer, e);
                        }
                    }
                    .instrument(info_span!("conn", %peer)),
                );
            }
        }
    }

    debug!("Accept loop stopped");
}
