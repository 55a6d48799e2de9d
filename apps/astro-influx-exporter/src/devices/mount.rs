use crate::devices::DeviceClass;
use crate::events::{event_point, EventContext};
use crate::listener::DeviceCategory;
use crate::point::Point;
use crate::schema::{sanitize_float, Metric, Reading, Snapshot};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct MountSnapshot {
    pub connected: bool,
    pub name: String,
    pub altitude: Option<f64>,
    pub azimuth: Option<f64>,
}

impl Snapshot for MountSnapshot {
    fn connected(&self) -> bool {
        self.connected
    }

    fn device_name(&self) -> &str {
        &self.name
    }
}

/// Equatorial coordinates: right ascension in hours, declination in degrees.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct Coordinates {
    pub ra: Option<f64>,
    pub dec: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MountEvent {
    Slewed { from: Coordinates, to: Coordinates },
    Parked,
    Unparked,
    Homed,
}

pub struct Mount;

impl DeviceCategory for Mount {
    const CLASS: DeviceClass = DeviceClass::Mount;
    type Snapshot = MountSnapshot;
    type Event = MountEvent;
    type State = ();

    const METRICS: &'static [Metric<MountSnapshot>] = &[
        Metric {
            measurement: "mount_altitude",
            read: |s| Reading::Float(s.altitude),
        },
        Metric {
            measurement: "mount_azimuth",
            read: |s| Reading::Float(s.azimuth),
        },
    ];

    fn event_points(
        _state: &mut (),
        event: &MountEvent,
        ctx: &EventContext,
    ) -> anyhow::Result<Vec<Point>> {
        let point = match event {
            MountEvent::Slewed { from, to } => {
                let (to_ra, to_dec) = (sanitize_float(to.ra), sanitize_float(to.dec));
                event_point(
                    ctx,
                    "mount_slewed",
                    "Mount slewed",
                    &format!("Mount slewed to RA {to_ra:.4}h Dec {to_dec:.3}°"),
                )
                .field("mount_slewed_from_ra", sanitize_float(from.ra))
                .field("mount_slewed_from_dec", sanitize_float(from.dec))
                .field("mount_slewed_to_ra", to_ra)
                .field("mount_slewed_to_dec", to_dec)
            }
            MountEvent::Parked => event_point(ctx, "mount_parked", "Mount parked", "Mount parked"),
            MountEvent::Unparked => {
                event_point(ctx, "mount_unparked", "Mount unparked", "Mount unparked")
            }
            MountEvent::Homed => event_point(ctx, "mount_homed", "Mount homed", "Mount homed"),
        };
        Ok(vec![point])
    }
}
