use crate::devices::{DeviceClass, NoEvent};
use crate::listener::DeviceCategory;
use crate::schema::{Metric, Reading, Snapshot};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CameraSnapshot {
    pub connected: bool,
    pub name: String,
    /// Sensor temperature in degrees C.
    pub temperature: Option<f64>,
    /// Cooler power in percent.
    pub cooler_power: Option<f64>,
    /// Battery level in percent; most cameras report none.
    pub battery: Option<f64>,
}

impl Snapshot for CameraSnapshot {
    fn connected(&self) -> bool {
        self.connected
    }

    fn device_name(&self) -> &str {
        &self.name
    }
}

pub struct Camera;

impl DeviceCategory for Camera {
    const CLASS: DeviceClass = DeviceClass::Camera;
    type Snapshot = CameraSnapshot;
    type Event = NoEvent;
    type State = ();

    const METRICS: &'static [Metric<CameraSnapshot>] = &[
        Metric {
            measurement: "camera_sensor_temperature",
            read: |s| Reading::Float(s.temperature),
        },
        Metric {
            measurement: "camera_cooler_power",
            read: |s| Reading::Float(s.cooler_power),
        },
        Metric {
            measurement: "camera_battery_level",
            read: |s| Reading::Whole(s.battery),
        },
    ];
}
