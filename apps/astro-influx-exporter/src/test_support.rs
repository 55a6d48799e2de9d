use crate::config::ExporterConfig;
use crate::dispatch::{ConnectionStatus, PointSink, SinkError, WriteTarget};
use crate::point::Point;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn valid_config() -> ExporterConfig {
    ExporterConfig {
        influxdb_url: "http://influx.test:8086".to_string(),
        influxdb_token: "test-token".to_string(),
        influxdb_org_id: "observatory".to_string(),
        influxdb_bucket: "astro".to_string(),
        host_name: "obs-pc".to_string(),
        ..ExporterConfig::default()
    }
}

#[derive(Clone, Debug)]
pub struct RecordedWrite {
    pub target: WriteTarget,
    pub points: Vec<Point>,
}

/// Records every write it is handed.
#[derive(Default)]
pub struct SpySink {
    writes: Mutex<Vec<RecordedWrite>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl SpySink {
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn points(&self) -> Vec<Point> {
        self.writes()
            .into_iter()
            .flat_map(|write| write.points)
            .collect()
    }

    pub fn measurements(&self) -> Vec<String> {
        self.points()
            .iter()
            .map(|point| point.measurement().to_string())
            .collect()
    }

    /// Waits until at least `count` write calls have been observed.
    pub async fn wait_for_calls(&self, count: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while self.call_count() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(
            waited.is_ok(),
            "expected {count} sink calls, saw {}",
            self.call_count()
        );
    }
}

impl PointSink for SpySink {
    fn write<'a>(
        &'a self,
        target: &'a WriteTarget,
        points: &'a [Point],
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            let failing = self.failing.load(Ordering::SeqCst);
            if !failing {
                self.writes.lock().unwrap().push(RecordedWrite {
                    target: target.clone(),
                    points: points.to_vec(),
                });
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            if failing {
                return Err(SinkError::Rejected {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            Ok(())
        })
    }

    fn check<'a>(&'a self, config: &'a ExporterConfig) -> BoxFuture<'a, ConnectionStatus> {
        Box::pin(async move {
            if config.is_valid() && !self.failing.load(Ordering::SeqCst) {
                ConnectionStatus::ok("spy sink reachable")
            } else {
                ConnectionStatus::failed("spy sink unavailable")
            }
        })
    }
}
