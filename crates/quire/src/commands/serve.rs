//! Serve command.

use anyhow::{Context, Result};
use quire_server::{ContentServer, ServerSettings};

/// Run the serve command until a shutdown signal arrives.
pub async fn run(settings: ServerSettings) -> Result<()> {
    let config = settings
        .validate()
        .context("Invalid server configuration")?;

    let server = ContentServer::bind(config).await?;
    server.run().await?;

    Ok(())
}
