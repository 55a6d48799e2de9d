use crate::devices::{DeviceClass, NoEvent};
use crate::listener::DeviceCategory;
use crate::point::{Point, Precision};
use crate::schema::{sanitize_float, Metric, Snapshot};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A read-only switch channel, e.g. a power box voltage or current sensor.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Gauge {
    pub id: u32,
    pub name: String,
    pub value: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SwitchSnapshot {
    pub connected: bool,
    pub name: String,
    pub gauges: Vec<Gauge>,
}

impl Snapshot for SwitchSnapshot {
    fn connected(&self) -> bool {
        self.connected
    }

    fn device_name(&self) -> &str {
        &self.name
    }
}

pub struct Switch;

impl DeviceCategory for Switch {
    const CLASS: DeviceClass = DeviceClass::Switch;
    type Snapshot = SwitchSnapshot;
    type Event = NoEvent;
    type State = ();

    // Gauges are dynamic, one measurement per channel id.
    const METRICS: &'static [Metric<SwitchSnapshot>] = &[];

    fn snapshot_points(_state: &mut (), snapshot: &SwitchSnapshot, now: DateTime<Utc>) -> Vec<Point> {
        if !snapshot.connected {
            return Vec::new();
        }
        snapshot
            .gauges
            .iter()
            .map(|gauge| {
                Point::new(format!("switch_ro_sw{}", gauge.id))
                    .tag("name", &gauge.name)
                    .field("value", sanitize_float(gauge.value))
                    .timestamp(now, Precision::Nanoseconds)
            })
            .collect()
    }
}
