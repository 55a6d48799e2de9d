use anyhow::{Context, Result};
use astro_influx_exporter::bridge::{self, BridgeState};
use astro_influx_exporter::cli::Args;
use astro_influx_exporter::config::{ConfigStore, ExporterConfig};
use astro_influx_exporter::dispatch::Dispatcher;
use astro_influx_exporter::exporter::Exporter;
use astro_influx_exporter::hub::EquipmentHub;
use astro_influx_exporter::influx::InfluxSink;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Handle;

fn init_tracing(config: &ExporterConfig) -> Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime::Tokio, trace::Config as OTelTraceConfig, Resource};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,astro_influx_exporter=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    let endpoint = config
        .otlp_endpoint
        .as_deref()
        .map(normalize_otlp_http_endpoint)
        .filter(|endpoint| !endpoint.is_empty());

    if let Some(endpoint) = endpoint {
        let exporter = opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(endpoint);
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(OTelTraceConfig::default().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "astro-influx-exporter"),
            ])))
            .install_batch(Tokio)?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

fn normalize_otlp_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.contains("/v1/traces") {
        return trimmed.to_string();
    }
    format!("{}/v1/traces", trimmed.trim_end_matches('/'))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (mut config, settings_error) = ExporterConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.http_bind = bind;
    }
    init_tracing(&config)?;
    if let Some(err) = settings_error {
        tracing::warn!(error = %format!("{err:#}"), "exporter settings ignored; using env defaults");
    }

    let sink = Arc::new(InfluxSink::new(config.write_timeout())?);
    let http_bind = config.http_bind.clone();
    let dispatcher = Dispatcher::new(sink, ConfigStore::new(config), Handle::current());

    if args.check_connection {
        let status = dispatcher.check_connection().await;
        println!("{}", serde_json::to_string_pretty(&status)?);
        if !status.ok {
            anyhow::bail!("influxdb connection check failed: {}", status.message);
        }
        return Ok(());
    }

    if !dispatcher.config().is_valid() {
        tracing::warn!("influxdb settings incomplete; points will be dropped until a profile supplies them");
    }

    let hub = EquipmentHub::new();
    let mut exporter = Exporter::start(&hub, dispatcher.clone());

    let startup_check = dispatcher.clone();
    tokio::spawn(async move {
        startup_check.check_connection().await;
    });

    let app = bridge::router(BridgeState {
        hub,
        dispatcher,
    });
    let listener = TcpListener::bind(&http_bind)
        .await
        .with_context(|| format!("failed to bind host bridge on {http_bind}"))?;
    tracing::info!(bind = %http_bind, "host bridge listening");
    let http_handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(error = %err, "host bridge exited");
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
        _ = http_handle => {}
    }

    exporter.teardown().await;
    Ok(())
}
