//! FRANC service portal server.
//!
//! Serves the portal's JSON API. Reads its configuration from the
//! environment (and `.env`), connects to Infrahub for option lookups and,
//! when enabled, to Kafka for request events.
//!
//! # Usage
//!
//! ```bash
//! INFRAHUB_ADDRESS=http://localhost:8000 cargo run --bin franc-portal
//! ```

use anyhow::Context;
use franc_portal_core::environment::SystemClock;
use franc_portal_core::event_bus::EventBus;
use franc_portal_forms::events::Topics;
use franc_portal_forms::reducer::BUS_DISABLED_NOTICE;
use franc_portal_forms::{OptionResolver, PortalEnvironment};
use franc_portal_inventory::InfrahubClient;
use franc_portal_redpanda::{NoopEventBus, RedpandaEventBus, SecurityProtocol};
use franc_portal_runtime::metrics::PortalMetrics;
use franc_portal_web::config::KafkaConfig;
use franc_portal_web::{AppState, Config, HelpProvider, router};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,franc_portal=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FRANC service portal...");

    let config = Config::from_env().context("invalid configuration")?;
    tracing::info!(
        infrahub = %config.infrahub.address,
        branch = %config.infrahub.branch,
        kafka_enabled = config.kafka.enabled,
        "Configuration loaded"
    );

    let metrics = PortalMetrics::install()?;

    let mut client = InfrahubClient::new(&config.infrahub.address).with_branch(&config.infrahub.branch);
    if let Some(token) = &config.infrahub.api_token {
        client = client.with_api_token(token);
    }
    let inventory = Arc::new(client.with_timeout(config.infrahub.timeout)?);

    let event_bus = event_bus(&config.kafka)?;

    let environment = PortalEnvironment::new(
        OptionResolver::new(inventory.clone(), config.infrahub.timeout),
        event_bus,
        inventory,
        Arc::new(SystemClock),
    )
    .with_topics(Topics::new(&config.kafka.topic_prefix))
    .with_branch_workflow(config.dc_create_branch)
    .with_simulator_time_scale(config.simulator_time_scale);

    let state = AppState::new(environment, HelpProvider::new(&config.help_dir)).with_metrics(metrics);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("cannot bind {address}"))?;
    tracing::info!(%address, "Portal listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

fn event_bus(kafka: &KafkaConfig) -> anyhow::Result<Arc<dyn EventBus>> {
    if !kafka.enabled {
        tracing::warn!("{BUS_DISABLED_NOTICE}");
        return Ok(Arc::new(NoopEventBus::new()));
    }

    let protocol: SecurityProtocol = kafka.security_protocol.parse()?;
    let mut builder = RedpandaEventBus::builder()
        .brokers(&kafka.bootstrap_servers)
        .client_id("franc-portal")
        .timeout(kafka.timeout)
        .security_protocol(protocol)
        .ssl_files(
            kafka.ssl_cafile.clone(),
            kafka.ssl_certfile.clone(),
            kafka.ssl_keyfile.clone(),
        );
    if let (Some(mechanism), Some(username), Some(password)) =
        (&kafka.sasl_mechanism, &kafka.sasl_username, &kafka.sasl_password)
    {
        builder = builder.sasl(mechanism, username, password);
    }

    let bus = builder.build()?;
    tracing::info!(brokers = %bus.brokers(), "Kafka producer ready");
    Ok(Arc::new(bus))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for shutdown signal");
    }
}
