//! Shopware language server entry point.
//!
//! Speaks LSP over stdio; logs go to stderr so the transport stays clean.

use anyhow::Context;
use tower_lsp::Server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let version = env!("CARGO_PKG_VERSION");
    tracing::info!("starting shopware-lsp {}", version);

    let cache_dir = dirs::cache_dir()
        .context("no user cache directory available")?
        .join("shopware-lsp");
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("failed to create cache directory {:?}", cache_dir))?;

    let (service, socket) = shopware_lsp_server::build_service(cache_dir, version)
        .context("failed to initialise the indexing engine")?;

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
