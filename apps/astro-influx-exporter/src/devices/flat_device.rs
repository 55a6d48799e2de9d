use crate::devices::DeviceClass;
use crate::events::{event_point, EventContext};
use crate::listener::DeviceCategory;
use crate::point::Point;
use crate::schema::{Metric, Snapshot};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FlatDeviceSnapshot {
    pub connected: bool,
    pub name: String,
}

impl Snapshot for FlatDeviceSnapshot {
    fn connected(&self) -> bool {
        self.connected
    }

    fn device_name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlatDeviceEvent {
    CoverOpened,
    CoverClosed,
    BrightnessChanged { from: i64, to: i64 },
    LightToggled { on: bool },
}

pub struct FlatDevice;

impl DeviceCategory for FlatDevice {
    const CLASS: DeviceClass = DeviceClass::FlatDevice;
    type Snapshot = FlatDeviceSnapshot;
    type Event = FlatDeviceEvent;
    type State = ();

    const METRICS: &'static [Metric<FlatDeviceSnapshot>] = &[];

    fn event_points(
        _state: &mut (),
        event: &FlatDeviceEvent,
        ctx: &EventContext,
    ) -> anyhow::Result<Vec<Point>> {
        let point = match event {
            FlatDeviceEvent::CoverOpened => {
                event_point(ctx, "calibrator_opened", "Cover opened", "Cover opened")
            }
            FlatDeviceEvent::CoverClosed => {
                event_point(ctx, "calibrator_closed", "Cover closed", "Cover closed")
            }
            FlatDeviceEvent::BrightnessChanged { from, to } => event_point(
                ctx,
                "calibrator_brightness",
                "Calibrator brightness changed",
                &format!("Calibrator brightness changed to {to}"),
            )
            .field("calibrator_brightness_from", *from)
            .field("calibrator_brightness_to", *to),
            FlatDeviceEvent::LightToggled { on } => {
                let state = if *on { "On" } else { "Off" };
                event_point(
                    ctx,
                    "calibrator_light_toggled",
                    "Calibrator light toggled",
                    &format!("Calibrator light: {state}"),
                )
                .field("calibrator_light_on", *on)
            }
        };
        Ok(vec![point])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::FieldValue;
    use chrono::Utc;

    #[test]
    fn brightness_change_keeps_both_levels() {
        let event: FlatDeviceEvent =
            serde_json::from_str(r#"{"kind":"brightness_changed","from":0,"to":120}"#).unwrap();
        let ctx = EventContext::new("events", Utc::now());
        let point = &FlatDevice::event_points(&mut (), &event, &ctx).unwrap()[0];

        assert_eq!(point.tag_value("name"), Some("calibrator_brightness"));
        assert_eq!(point.field_value("calibrator_brightness_to"), Some(&FieldValue::Integer(120)));
    }

    #[test]
    fn light_toggle_reports_state() {
        let ctx = EventContext::new("events", Utc::now());
        let point = &FlatDevice::event_points(&mut (), &FlatDeviceEvent::LightToggled { on: false }, &ctx)
            .unwrap()[0];
        assert_eq!(
            point.field_value("text"),
            Some(&FieldValue::String("Calibrator light: Off".into()))
        );
        assert_eq!(point.field_value("calibrator_light_on"), Some(&FieldValue::Boolean(false)));
    }
}
