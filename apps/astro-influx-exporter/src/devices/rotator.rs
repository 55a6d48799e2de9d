use crate::devices::{DeviceClass, NoEvent};
use crate::listener::DeviceCategory;
use crate::schema::{Metric, Reading, Snapshot};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RotatorSnapshot {
    pub connected: bool,
    pub name: String,
    pub mechanical_position: Option<f64>,
    /// Sky position angle after sync.
    pub position: Option<f64>,
}

impl Snapshot for RotatorSnapshot {
    fn connected(&self) -> bool {
        self.connected
    }

    fn device_name(&self) -> &str {
        &self.name
    }
}

pub struct Rotator;

impl DeviceCategory for Rotator {
    const CLASS: DeviceClass = DeviceClass::Rotator;
    type Snapshot = RotatorSnapshot;
    type Event = NoEvent;
    type State = ();

    const METRICS: &'static [Metric<RotatorSnapshot>] = &[
        Metric {
            measurement: "rotator_mechanical_angle",
            read: |s| Reading::Float(s.mechanical_position),
        },
        Metric {
            measurement: "rotator_angle",
            read: |s| Reading::Float(s.position),
        },
    ];
}
