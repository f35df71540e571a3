//! Server process: socket ownership, lifecycle and shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::routes;

/// Pause after a failed accept (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A content server holding its bound listener.
pub struct ContentServer {
    config: ServerConfig,
    listener: TcpListener,
}

impl ContentServer {
    /// Bind the configured address. Fails if the port is taken.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = config.addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(addr, e))?;

        Ok(Self { config, listener })
    }

    /// Serve on a listener the caller already bound.
    pub fn from_listener(config: ServerConfig, listener: TcpListener) -> Self {
        Self { config, listener }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The address actually bound (resolves port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::Serve)
    }

    /// The router this server dispatches to.
    pub fn router(&self) -> Router {
        routes::router(&self.config)
    }

    /// Serve until SIGINT or SIGTERM, then drain in-flight requests.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    ///
    /// Each connection gets the configured timeout as its HTTP/1 header
    /// read timeout, so a client that stays silent or never finishes its
    /// request head is disconnected.
    /// The listener is dropped when this returns, on success or error.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr = self.local_addr()?;

        // HTTP/1 only: version sniffing would wait on silent clients untimed.
        let mut builder = Builder::new(TokioExecutor::new()).http1_only();
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.request_timeout());

        tracing::info!(
            "Serving {} at http://{}{}",
            self.config.root().path().display(),
            addr,
            self.config.api_prefix()
        );

        let listener = self.listener;
        let graceful = GracefulShutdown::new();
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
                () = &mut shutdown => break,
            };

            let service = TowerToHyperService::new(app.clone());
            let connection = builder.serve_connection(TokioIo::new(stream), service);
            let connection = graceful.watch(connection.into_owned());

            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::debug!("Connection from {} closed: {}", peer, e);
                }
            });
        }

        drop(listener);
        tracing::info!("Draining connections on {}", addr);
        graceful.shutdown().await;

        tracing::info!("Server on {} stopped", addr);
        Ok(())
    }

    /// Run on a background task and return a handle to stop it.
    pub fn spawn(self) -> Result<ServerHandle, ServerError> {
        let addr = self.local_addr()?;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(self.run_until(async move {
            // A dropped sender also means stop.
            let _ = stop_rx.await;
        }));

        Ok(ServerHandle {
            addr,
            stop: Some(stop_tx),
            task: Some(task),
        })
    }
}

/// Handle to a spawned [`ContentServer`].
///
/// Dropping the handle signals shutdown as well.
pub struct ServerHandle {
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and wait for the server to finish draining.
    pub async fn stop(mut self) -> Result<(), ServerError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }

        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| ServerError::Task(e.to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
