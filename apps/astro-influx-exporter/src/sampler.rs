use crate::config::Observer;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::ephemeris::{moon_altitude, sun_altitude};
use crate::point::{Point, Precision};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerState {
    Idle,
    Running,
    Cancelled,
}

pub fn astro_points(now: DateTime<Utc>, observer: &Observer) -> Vec<Point> {
    vec![
        Point::new("astro_sun_altitude")
            .field("value", sun_altitude(now, observer))
            .timestamp(now, Precision::Nanoseconds),
        Point::new("astro_moon_altitude")
            .field("value", moon_altitude(now, observer))
            .timestamp(now, Precision::Nanoseconds),
    ]
}

/// Samples sun and moon altitude for the configured observer on a fixed cadence.
pub struct AstroSampler {
    dispatcher: Dispatcher,
    interval: Duration,
    state: watch::Sender<SamplerState>,
}

impl AstroSampler {
    pub fn new(dispatcher: Dispatcher, interval: Duration) -> Self {
        let (state, _) = watch::channel(SamplerState::Idle);
        Self {
            dispatcher,
            interval,
            state,
        }
    }

    pub fn state(&self) -> SamplerState {
        *self.state.borrow()
    }

    /// Samples once immediately, then every interval until `cancel` fires.
    pub fn start(self, cancel: CancellationToken) -> SamplerHandle {
        let state = self.state.subscribe();
        let dispatcher = self.dispatcher.clone();
        let runtime = dispatcher.runtime().clone();
        let sender = self.state;
        let interval = self.interval;
        let token = cancel.clone();

        let task = runtime.spawn(async move {
            sender.send_replace(SamplerState::Running);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let config = dispatcher.config();
                        if !config.is_valid() {
                            continue;
                        }
                        let points = astro_points(Utc::now(), &config.observer);
                        if dispatcher.dispatch(points, None).await == DispatchOutcome::Failed {
                            tracing::debug!("astro sample not written");
                        }
                    }
                }
            }
            sender.send_replace(SamplerState::Cancelled);
            tracing::debug!("astro sampler stopped");
        });

        SamplerHandle {
            state,
            cancel,
            task,
        }
    }
}

pub struct SamplerHandle {
    state: watch::Receiver<SamplerState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SamplerHandle {
    pub fn state(&self) -> SamplerState {
        *self.state.borrow()
    }

    /// Requests cancellation and waits for the loop to exit.
    pub async fn stop(self) -> SamplerState {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "astro sampler task ended abnormally");
        }
        *self.state.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStore, ExporterConfig};
    use crate::test_support::{valid_config, SpySink};
    use std::sync::Arc;
    use tokio::runtime::Handle;

    fn sampler(sink: Arc<SpySink>, config: ExporterConfig) -> AstroSampler {
        let dispatcher = Dispatcher::new(sink, ConfigStore::new(config), Handle::current());
        AstroSampler::new(dispatcher, Duration::from_secs(60))
    }

    #[test]
    fn sun_and_moon_points() {
        let points = astro_points(Utc::now(), &Observer::default());
        let names: Vec<&str> = points.iter().map(Point::measurement).collect();
        assert_eq!(names, vec!["astro_sun_altitude", "astro_moon_altitude"]);
        assert!(points.iter().all(|p| p.precision() == Precision::Nanoseconds));
    }

    #[tokio::test(start_paused = true)]
    async fn samples_immediately_then_every_interval() {
        let sink = Arc::new(SpySink::default());
        let sampler = sampler(sink.clone(), valid_config());
        assert_eq!(sampler.state(), SamplerState::Idle);

        let handle = sampler.start(CancellationToken::new());
        sink.wait_for_calls(1).await;
        assert_eq!(handle.state(), SamplerState::Running);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(sink.call_count(), 2);
        assert_eq!(sink.measurements()[..2], ["astro_sun_altitude", "astro_moon_altitude"]);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_between_ticks_ends_cleanly() {
        let sink = Arc::new(SpySink::default());
        let cancel = CancellationToken::new();
        let handle = sampler(sink.clone(), valid_config()).start(cancel.clone());
        sink.wait_for_calls(1).await;

        tokio::time::sleep(Duration::from_secs(30)).await;
        cancel.cancel();
        assert_eq!(handle.stop().await, SamplerState::Cancelled);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(sink.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unconfigured_exporter_keeps_sampler_idle_on_the_wire() {
        let sink = Arc::new(SpySink::default());
        let handle = sampler(sink.clone(), ExporterConfig::default()).start(CancellationToken::new());

        tokio::time::sleep(Duration::from_secs(185)).await;
        assert_eq!(sink.call_count(), 0);
        assert_eq!(handle.state(), SamplerState::Running);
        assert_eq!(handle.stop().await, SamplerState::Cancelled);
    }
}
