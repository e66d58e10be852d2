//! Remote mediation daemon.
//!
//! Registers the configured probes with the mediation server and serves its
//! requests until killed. Reconnects on its own; exits only on a protocol
//! incompatibility.
//!
//!   mediation-daemon --config probe.toml --password "$PW"
//!   MEDIATION_SERVER_ADDRESS=10.10.173.154:8080 mediation-daemon -c probe.toml

mod config;
mod handlers;

use clap::Parser;
use config::{Args, Settings};
use handlers::LoggingHandlers;
use mediation_client::{
    ConnectionSupervisor, HandlerCapabilitySet, SupervisorConfig, WsConnector,
};
use mediation_core::{ClientMessage, JsonCodec};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mediation=info".parse()?))
        .init();

    let settings = Settings::load(Args::parse())?;

    let probes = match &settings.registration {
        ClientMessage::ContainerInfo(info) => info.probes.len(),
        _ => 0,
    };
    tracing::info!(
        server = settings.endpoint.server_address(),
        user = settings.endpoint.username(),
        probes,
        "starting mediation daemon"
    );

    let handlers: Option<Arc<dyn HandlerCapabilitySet>> = if settings.handlers {
        Some(Arc::new(LoggingHandlers))
    } else {
        tracing::warn!("no handler set, server requests will be dropped");
        None
    };

    let supervisor = ConnectionSupervisor::new(
        WsConnector,
        settings.endpoint,
        settings.registration,
        Arc::new(JsonCodec),
        handlers,
        SupervisorConfig {
            backoff: settings.backoff,
        },
    );

    let Err(fatal) = supervisor.run().await;
    Err(anyhow::Error::new(fatal).context("mediation client stopped"))
}
