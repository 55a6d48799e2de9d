use crate::devices::DeviceClass;
use crate::events::{event_point, EventContext};
use crate::listener::DeviceCategory;
use crate::point::Point;
use crate::schema::{Metric, Snapshot};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SafetySnapshot {
    pub connected: bool,
    pub name: String,
    pub is_safe: Option<bool>,
}

impl Snapshot for SafetySnapshot {
    fn connected(&self) -> bool {
        self.connected
    }

    fn device_name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SafetyEvent {
    IsSafeChanged { is_safe: bool },
}

/// Start of the current unsafe interval, if one is open.
#[derive(Debug, Default)]
pub struct UnsafeInterval {
    since: Option<DateTime<Utc>>,
}

pub struct SafetyMonitor;

impl DeviceCategory for SafetyMonitor {
    const CLASS: DeviceClass = DeviceClass::SafetyMonitor;
    type Snapshot = SafetySnapshot;
    type Event = SafetyEvent;
    type State = UnsafeInterval;

    const METRICS: &'static [Metric<SafetySnapshot>] = &[];

    fn event_points(
        state: &mut UnsafeInterval,
        event: &SafetyEvent,
        ctx: &EventContext,
    ) -> anyhow::Result<Vec<Point>> {
        let SafetyEvent::IsSafeChanged { is_safe } = *event;
        let mut points = vec![event_point(
            ctx,
            "safety_safe_state",
            "Safety state changed",
            &format!("Safe state changed to {is_safe}"),
        )
        .field("safety_issafe", is_safe)];

        if !is_safe {
            state.since.get_or_insert(ctx.now);
        } else if let Some(start) = state.since.take() {
            let end = ctx.now;
            let duration = (end - start).num_milliseconds() as f64 / 1000.0;
            points.push(
                event_point(
                    ctx,
                    "safety_unsafe_period",
                    "Unsafe period ended",
                    &format!("Conditions were unsafe for {duration:.0} s"),
                )
                .field("unsafe_start", start.timestamp_millis())
                .field("unsafe_end", end.timestamp_millis())
                .field("duration_seconds", duration),
            );
        }
        Ok(points)
    }
}
