//! Development server command.

use anyhow::{Context, Result};
use quire_content::ContentRoot;
use quire_server::{ContentEvent, ContentServer, ContentWatcher, ServerSettings};

/// Run the server with the content root watched for changes.
///
/// Every request rescans or re-resolves, so changes are live without a
/// restart; the watcher only reports them.
pub async fn run(settings: ServerSettings) -> Result<()> {
    let config = settings
        .validate()
        .context("Invalid server configuration")?;

    let (watcher, mut rx) = ContentWatcher::new(config.root())?;
    tracing::info!("Watching {} for changes", config.root().path().display());

    let root = config.root().clone();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            report_change(&root, &event).await;
        }
        // Keep watcher alive
        drop(watcher);
    });

    let server = ContentServer::bind(config).await?;
    server.run().await?;

    Ok(())
}

async fn report_change(root: &ContentRoot, event: &ContentEvent) {
    match event {
        ContentEvent::Added(path) => tracing::info!("Added: {}", path.display()),
        ContentEvent::Changed(path) => tracing::info!("Changed: {}", path.display()),
        ContentEvent::Removed(path) => tracing::info!("Removed: {}", path.display()),
    }

    let root = root.clone();
    match tokio::task::spawn_blocking(move || root.list_files()).await {
        Ok(entries) => tracing::debug!("Catalog now lists {} files", entries.len()),
        Err(e) => tracing::warn!("Catalog rescan failed: {}", e),
    }
}
