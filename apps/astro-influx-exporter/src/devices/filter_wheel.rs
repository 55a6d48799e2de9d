use crate::devices::DeviceClass;
use crate::dispatch::DispatchOutcome;
use crate::events::{event_point, EventContext};
use crate::listener::DeviceCategory;
use crate::point::{Point, Precision};
use crate::schema::{Metric, Snapshot};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// The selected filter is resent at most this often.
const FILTER_REPORT_INTERVAL_SECS: i64 = 60;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilterWheelSnapshot {
    pub connected: bool,
    pub name: String,
    pub selected_filter: Option<String>,
    pub is_moving: bool,
}

impl Snapshot for FilterWheelSnapshot {
    fn connected(&self) -> bool {
        self.connected
    }

    fn device_name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterWheelEvent {
    FilterChanged {
        #[serde(default)]
        from: String,
        #[serde(default)]
        to: String,
    },
}

#[derive(Debug, Default)]
pub struct FilterThrottle {
    last_written: Option<DateTime<Utc>>,
    in_flight: bool,
}

pub struct FilterWheel;

impl DeviceCategory for FilterWheel {
    const CLASS: DeviceClass = DeviceClass::FilterWheel;
    type Snapshot = FilterWheelSnapshot;
    type Event = FilterWheelEvent;
    type State = FilterThrottle;

    const METRICS: &'static [Metric<FilterWheelSnapshot>] = &[];

    fn snapshot_points(
        state: &mut FilterThrottle,
        snapshot: &FilterWheelSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<Point> {
        if !snapshot.connected || snapshot.is_moving || state.in_flight {
            return Vec::new();
        }
        let Some(filter) = snapshot
            .selected_filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
        else {
            return Vec::new();
        };
        if let Some(last) = state.last_written {
            if (now - last).num_seconds() < FILTER_REPORT_INTERVAL_SECS {
                return Vec::new();
            }
        }

        state.in_flight = true;
        vec![Point::new("fwheel_filter")
            .field("value", filter)
            .timestamp(now, Precision::Seconds)]
    }

    fn snapshot_dispatched(state: &mut FilterThrottle, at: DateTime<Utc>, outcome: DispatchOutcome) {
        state.in_flight = false;
        if let DispatchOutcome::Written(_) = outcome {
            state.last_written = Some(at);
        }
    }

    fn event_points(
        _state: &mut FilterThrottle,
        event: &FilterWheelEvent,
        ctx: &EventContext,
    ) -> anyhow::Result<Vec<Point>> {
        let FilterWheelEvent::FilterChanged { from, to } = event;
        tracing::info!(%from, %to, "filter changed");
        let point = event_point(
            ctx,
            "filter_change",
            "Filter changed",
            &format!("Filter changed from {from} to {to}"),
        )
        .field("filter_from", from.as_str())
        .field("filter_to", to.as_str());
        Ok(vec![point])
    }
}
