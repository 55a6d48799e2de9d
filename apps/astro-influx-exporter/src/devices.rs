pub mod camera;
pub mod dome;
pub mod filter_wheel;
pub mod flat_device;
pub mod focuser;
pub mod guider;
pub mod mount;
pub mod rotator;
pub mod safety;
pub mod switch;
pub mod weather;

pub use camera::Camera;
pub use dome::Dome;
pub use filter_wheel::FilterWheel;
pub use flat_device::FlatDevice;
pub use focuser::Focuser;
pub use guider::Guider;
pub use mount::Mount;
pub use rotator::Rotator;
pub use safety::SafetyMonitor;
pub use switch::Switch;
pub use weather::Weather;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Camera,
    Focuser,
    Mount,
    Rotator,
    Guider,
    Weather,
    Switch,
    FilterWheel,
    Dome,
    FlatDevice,
    SafetyMonitor,
}

impl DeviceClass {
    pub const ALL: [DeviceClass; 11] = [
        DeviceClass::Camera,
        DeviceClass::Focuser,
        DeviceClass::Mount,
        DeviceClass::Rotator,
        DeviceClass::Guider,
        DeviceClass::Weather,
        DeviceClass::Switch,
        DeviceClass::FilterWheel,
        DeviceClass::Dome,
        DeviceClass::FlatDevice,
        DeviceClass::SafetyMonitor,
    ];

    /// Slug used in bridge routes and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Camera => "camera",
            DeviceClass::Focuser => "focuser",
            DeviceClass::Mount => "mount",
            DeviceClass::Rotator => "rotator",
            DeviceClass::Guider => "guider",
            DeviceClass::Weather => "weather",
            DeviceClass::Switch => "switch",
            DeviceClass::FilterWheel => "filter_wheel",
            DeviceClass::Dome => "dome",
            DeviceClass::FlatDevice => "flat_device",
            DeviceClass::SafetyMonitor => "safety_monitor",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DeviceClass::Camera => "Camera",
            DeviceClass::Focuser => "Focuser",
            DeviceClass::Mount => "Mount",
            DeviceClass::Rotator => "Rotator",
            DeviceClass::Guider => "Guider",
            DeviceClass::Weather => "Weather station",
            DeviceClass::Switch => "Switch",
            DeviceClass::FilterWheel => "Filter Wheel",
            DeviceClass::Dome => "Dome",
            DeviceClass::FlatDevice => "Cover/Calibrator",
            DeviceClass::SafetyMonitor => "Safety monitor",
        }
    }

    /// Prefix for event `name` tags, e.g. `fwheel_connected`.
    pub fn event_prefix(self) -> &'static str {
        match self {
            DeviceClass::Weather => "wx",
            DeviceClass::FilterWheel => "fwheel",
            DeviceClass::FlatDevice => "calibrator",
            DeviceClass::SafetyMonitor => "safety",
            other => other.as_str(),
        }
    }

    /// Default tag carrying the driver's display name, e.g. `camera_name`.
    pub fn tag_key(self) -> String {
        format!("{}_name", self.as_str())
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown device category: {0}")]
pub struct UnknownDeviceClass(pub String);

impl FromStr for DeviceClass {
    type Err = UnknownDeviceClass;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        DeviceClass::ALL
            .into_iter()
            .find(|class| class.as_str() == normalized)
            .ok_or_else(|| UnknownDeviceClass(raw.to_string()))
    }
}

/// Uninhabited event type for categories that only report connection changes.
#[derive(Clone, Debug, Deserialize)]
pub enum NoEvent {}
