//! UnitedDeployment admission webhook server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use united_webhook::telemetry::{init_telemetry, LogFormat};
use united_webhook::{start_server, AdmissionPolicy, EnvelopeCodec, ServerConfig, WebhookState};

/// Admission webhook marking and enforcing UnitedDeployment-owned Deployments
#[derive(Parser, Debug)]
#[command(name = "united-webhook", version, about, long_about = None)]
struct Cli {
    /// Address the HTTPS listener binds to
    #[arg(long, env = "WEBHOOK_LISTEN_ADDR", default_value = "0.0.0.0:8443")]
    listen_addr: SocketAddr,

    /// Serving certificate (PEM)
    #[arg(long, env = "WEBHOOK_TLS_CERT", default_value = "/etc/webhook/certs/tls.crt")]
    tls_cert: PathBuf,

    /// Serving certificate private key (PEM)
    #[arg(long, env = "WEBHOOK_TLS_KEY", default_value = "/etc/webhook/certs/tls.key")]
    tls_key: PathBuf,

    /// Log output format
    #[arg(long, env = "WEBHOOK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(cli.log_format)?;

    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("failed to install aws-lc-rs crypto provider");
    }

    let state = Arc::new(WebhookState::new(
        AdmissionPolicy::default(),
        EnvelopeCodec::default(),
    ));

    let config = ServerConfig {
        addr: cli.listen_addr,
        cert_path: cli.tls_cert,
        key_path: cli.tls_key,
    };

    start_server(config, state).await?;
    Ok(())
}
