use crate::devices::DeviceClass;
use crate::events::{event_point, EventContext};
use crate::listener::DeviceCategory;
use crate::point::Point;
use crate::schema::{sanitize_float, Metric, Snapshot};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DomeSnapshot {
    pub connected: bool,
    pub name: String,
}

impl Snapshot for DomeSnapshot {
    fn connected(&self) -> bool {
        self.connected
    }

    fn device_name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomeEvent {
    ShutterOpened,
    ShutterClosed,
    Homed,
    Parked,
    /// Azimuth in degrees.
    Slewed { from: Option<f64>, to: Option<f64> },
}

pub struct Dome;

impl DeviceCategory for Dome {
    const CLASS: DeviceClass = DeviceClass::Dome;
    type Snapshot = DomeSnapshot;
    type Event = DomeEvent;
    type State = ();

    const METRICS: &'static [Metric<DomeSnapshot>] = &[];

    fn event_points(
        _state: &mut (),
        event: &DomeEvent,
        ctx: &EventContext,
    ) -> anyhow::Result<Vec<Point>> {
        let point = match event {
            DomeEvent::ShutterOpened => event_point(
                ctx,
                "dome_shutter_open",
                "Dome shutter opened",
                "Dome shutter opened",
            ),
            DomeEvent::ShutterClosed => event_point(
                ctx,
                "dome_shutter_close",
                "Dome shutter closed",
                "Dome shutter closed",
            ),
            DomeEvent::Homed => event_point(ctx, "dome_shutter_homed", "Dome homed", "Dome homed"),
            DomeEvent::Parked => event_point(ctx, "dome_shutter_parked", "Dome parked", "Dome parked"),
            DomeEvent::Slewed { from, to } => {
                let to = sanitize_float(*to);
                event_point(
                    ctx,
                    "dome_slewed",
                    "Dome slewed azimuth",
                    &format!("Dome slewed azimuth to {to:.2}°"),
                )
                .field("dome_slewed_from", sanitize_float(*from))
                .field("dome_slewed_to", to)
            }
        };
        Ok(vec![point])
    }
}
