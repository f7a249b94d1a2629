use rawhttp::config::Config;
use rawhttp::routes::Routes;
use rawhttp::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let server = Server::bind(&cfg.server, Routes::new(&cfg.routes)).await?;
    tracing::info!("Server started on port {}", server.local_addr().port());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    server.close().await?;
    tracing::info!("Server gracefully stopped");
    Ok(())
}
