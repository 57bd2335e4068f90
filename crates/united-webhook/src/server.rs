//! HTTPS server for the admission webhook
//!
//! The API server only calls admission webhooks over TLS, so the listener is
//! always bound with the serving certificate mounted into the pod.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tracing::{info, warn};

use crate::error::ServerError;
use crate::webhook::{webhook_router, WebhookState};

/// Time in-flight admission requests get to finish after a shutdown signal
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server
    pub addr: SocketAddr,
    /// TLS certificate PEM file
    pub cert_path: PathBuf,
    /// TLS private key PEM file
    pub key_path: PathBuf,
}

/// Start the admission webhook server and run until SIGINT/SIGTERM
pub async fn start_server(
    config: ServerConfig,
    state: Arc<WebhookState>,
) -> Result<(), ServerError> {
    let app = webhook_router(state);

    let tls_config = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
        .await
        .map_err(ServerError::Tls)?;

    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    info!(
        addr = %config.addr,
        cert = %config.cert_path.display(),
        "Starting admission webhook server"
    );

    axum_server::bind_rustls(config.addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(ServerError::Serve)?;

    info!("Admission webhook server stopped");
    Ok(())
}

async fn shutdown_on_signal(handle: Handle) {
    wait_for_signal().await;
    info!(
        grace_period_secs = SHUTDOWN_GRACE_PERIOD.as_secs(),
        "Shutdown signal received, draining connections"
    );
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
