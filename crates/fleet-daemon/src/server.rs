//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::backend::{self, ContainerBackend};
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::scheduler::Reconciler;
use crate::store::{DesiredStateStore, InMemoryStore};
use crate::tls;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::future::Future;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Fleet daemon server
pub struct Server {
    config: DaemonConfig,
    store: Arc<dyn DesiredStateStore>,
    reconciler: Arc<Reconciler>,
    reconcile_rx: mpsc::Receiver<()>,
    tls: Option<RustlsConfig>,
}

impl Server {
    /// Create a new server with the given configuration
    ///
    /// Fails when the backend client or the listener's TLS configuration
    /// cannot be built, e.g. unreadable certificates or an unsupported
    /// daemon address.
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let backend = backend::connect(&config.backend, &config.tls)?;
        Self::with_backend(config, backend)
    }

    /// Create a server around an already constructed backend
    pub fn with_backend(
        config: DaemonConfig,
        backend: Arc<dyn ContainerBackend>,
    ) -> DaemonResult<Self> {
        let tls = if config.server.tls {
            Some(tls::server_config(&config.tls)?)
        } else {
            tracing::warn!("Control surface TLS is disabled; callers are not authenticated");
            None
        };

        let store: Arc<dyn DesiredStateStore> = Arc::new(InMemoryStore::new());

        let (reconciler, reconcile_rx) =
            Reconciler::new(config.scheduler.clone(), store.clone(), backend);

        Ok(Self {
            config,
            store,
            reconciler,
            reconcile_rx,
            tls,
        })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let listener = TcpListener::bind(addr)
            .and_then(|listener| {
                listener.set_nonblocking(true)?;
                Ok(listener)
            })
            .map_err(|e| DaemonError::Server(format!("failed to bind {}: {}", addr, e)))?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound, non-blocking listener until `shutdown` completes
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> DaemonResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Server {
            config,
            store,
            reconciler,
            reconcile_rx,
            tls,
        } = self;

        let addr = listener.local_addr()?;
        let state = AppState::new(store, reconciler.clone());
        let app = create_router(state, &config.server);

        let handle = Handle::new();
        let grace = Duration::from_secs(config.server.request_timeout_secs);
        tokio::spawn({
            let handle = handle.clone();
            async move {
                shutdown.await;
                handle.graceful_shutdown(Some(grace));
            }
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let reconciler = tokio::spawn(reconciler.run(reconcile_rx, shutdown_rx));

        tracing::info!(addr = %addr, tls = tls.is_some(), "Fleet daemon listening");

        let served = match tls {
            Some(tls) => {
                axum_server::from_tcp_rustls(listener, tls)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await
            }
            None => {
                axum_server::from_tcp(listener)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await
            }
        }
        .map_err(|e| DaemonError::Server(e.to_string()));

        tracing::info!("Fleet daemon shutting down");

        let _ = shutdown_tx.send(true);
        if let Err(e) = reconciler.await {
            tracing::error!(error = %e, "Reconciler task failed");
        }

        served
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
