use crate::config::{ConfigStore, ExporterConfig};
use crate::point::{Point, PointError};
use crate::tags::{DefaultTags, Equipment};
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server rejected write with {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("nothing encodable in batch: {0}")]
    Encode(#[from] PointError),
    #[error("invalid sink url: {0}")]
    InvalidUrl(String),
}

/// Where a batch goes. Built from one configuration snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteTarget {
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub token: String,
}

impl WriteTarget {
    pub fn from_config(config: &ExporterConfig) -> Self {
        Self {
            url: config.influxdb_url.trim().to_string(),
            org: config.influxdb_org_id.trim().to_string(),
            bucket: config.influxdb_bucket.trim().to_string(),
            token: config.influxdb_token.trim().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub ok: bool,
    pub message: String,
}

impl ConnectionStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Outbound side of the pipeline: one call writes one batch.
pub trait PointSink: Send + Sync {
    fn write<'a>(
        &'a self,
        target: &'a WriteTarget,
        points: &'a [Point],
    ) -> BoxFuture<'a, Result<(), SinkError>>;

    fn check<'a>(&'a self, _config: &'a ExporterConfig) -> BoxFuture<'a, ConnectionStatus> {
        Box::pin(async { ConnectionStatus::failed("connection check not supported by this sink") })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Config invalid or nothing to send; no network call was made.
    Skipped,
    Written(usize),
    Failed,
}

#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn PointSink>,
    config: ConfigStore,
    runtime: Handle,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn PointSink>, config: ConfigStore, runtime: Handle) -> Self {
        Self {
            sink,
            config,
            runtime,
        }
    }

    pub fn config(&self) -> Arc<ExporterConfig> {
        self.config.snapshot()
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub async fn check_connection(&self) -> ConnectionStatus {
        let config = self.config.snapshot();
        let status = self.sink.check(&config).await;
        if !status.ok {
            tracing::warn!(message = %status.message, "influxdb connection check failed");
        }
        status
    }

    /// Decorates and writes one batch. Reads the configuration fresh so a
    /// profile change takes effect on the next write.
    pub async fn dispatch(
        &self,
        mut points: Vec<Point>,
        equipment: Option<&Equipment>,
    ) -> DispatchOutcome {
        let config = self.config.snapshot();
        if !config.is_valid() {
            tracing::debug!(
                points = points.len(),
                "influxdb settings incomplete; skipping write"
            );
            return DispatchOutcome::Skipped;
        }
        if points.is_empty() {
            return DispatchOutcome::Skipped;
        }

        DefaultTags::from_config(&config, equipment).apply(&mut points);
        let target = WriteTarget::from_config(&config);
        let measurement = points[0].measurement().to_string();

        match self.sink.write(&target, &points).await {
            Ok(()) => {
                tracing::trace!(points = points.len(), %measurement, "wrote points");
                DispatchOutcome::Written(points.len())
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    points = points.len(),
                    %measurement,
                    "failed to write points to influxdb"
                );
                DispatchOutcome::Failed
            }
        }
    }

    /// Fire-and-forget variant; the caller never waits on the network.
    pub fn spawn(&self, points: Vec<Point>, equipment: Option<Equipment>) -> JoinHandle<DispatchOutcome> {
        let dispatcher = self.clone();
        self.runtime.spawn(async move {
            dispatcher.dispatch(points, equipment.as_ref()).await
        })
    }
}
