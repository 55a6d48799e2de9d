use crate::devices::DeviceClass;
use crate::events::{event_point, EventContext};
use crate::listener::DeviceCategory;
use crate::point::Point;
use crate::schema::{sanitize_count, sanitize_float, Metric, Reading, Snapshot};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FocuserSnapshot {
    pub connected: bool,
    pub name: String,
    pub temperature: Option<f64>,
    pub position: Option<i64>,
}

impl Snapshot for FocuserSnapshot {
    fn connected(&self) -> bool {
        self.connected
    }

    fn device_name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FocuserEvent {
    AutofocusCompleted {
        position: Option<i64>,
        temperature: Option<f64>,
        #[serde(default)]
        filter: String,
        duration_seconds: Option<f64>,
    },
}

pub struct Focuser;

impl DeviceCategory for Focuser {
    const CLASS: DeviceClass = DeviceClass::Focuser;
    type Snapshot = FocuserSnapshot;
    type Event = FocuserEvent;
    type State = ();

    const METRICS: &'static [Metric<FocuserSnapshot>] = &[
        Metric {
            measurement: "focuser_temperature",
            read: |s| Reading::Float(s.temperature),
        },
        Metric {
            measurement: "focuser_position",
            read: |s| Reading::Count(s.position),
        },
    ];

    fn event_points(
        _state: &mut (),
        event: &FocuserEvent,
        ctx: &EventContext,
    ) -> anyhow::Result<Vec<Point>> {
        let FocuserEvent::AutofocusCompleted {
            position,
            temperature,
            filter,
            duration_seconds,
        } = event;

        let position = sanitize_count(*position);
        let text = if filter.trim().is_empty() {
            format!("Autofocus completed at position {position}")
        } else {
            format!("Autofocus completed at position {position} with filter {filter}")
        };
        let point = event_point(ctx, "autofocus_completed", "Autofocus completed", &text)
            .field("autofocus_position", position)
            .field("autofocus_temperature", sanitize_float(*temperature))
            .field("autofocus_duration_seconds", sanitize_float(*duration_seconds))
            .field("autofocus_filter", filter.trim());
        Ok(vec![point])
    }
}
