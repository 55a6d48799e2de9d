use crate::devices::DeviceClass;
use crate::point::{Point, Precision};
use chrono::{DateTime, Utc};

/// Everything an event builder needs besides the event itself.
#[derive(Clone, Debug)]
pub struct EventContext {
    pub measurement: String,
    pub now: DateTime<Utc>,
}

impl EventContext {
    pub fn new(measurement: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            now,
        }
    }
}

/// Base event point: `name` tag plus `title`/`text` fields, millisecond precision.
pub fn event_point(ctx: &EventContext, name: &str, title: &str, text: &str) -> Point {
    Point::new(ctx.measurement.as_str())
        .tag("name", name)
        .field("title", title)
        .field("text", text)
        .timestamp(ctx.now, Precision::Milliseconds)
}

pub fn connection_point(ctx: &EventContext, class: DeviceClass, connected: bool) -> Point {
    let state = if connected { "connected" } else { "disconnected" };
    let name = format!("{}_{state}", class.event_prefix());
    let title = format!("{} {state}", class.label());
    event_point(ctx, &name, &title, &title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::FieldValue;

    #[test]
    fn connection_points_use_category_prefix() {
        let ctx = EventContext::new("events", Utc::now());
        let point = connection_point(&ctx, DeviceClass::FilterWheel, true);

        assert_eq!(point.measurement(), "events");
        assert_eq!(point.tag_value("name"), Some("fwheel_connected"));
        assert_eq!(
            point.field_value("title"),
            Some(&FieldValue::String("Filter Wheel connected".into()))
        );
        assert_eq!(point.precision(), Precision::Milliseconds);

        let point = connection_point(&ctx, DeviceClass::Dome, false);
        assert_eq!(point.tag_value("name"), Some("dome_disconnected"));
    }

    #[test]
    fn custom_event_measurement() {
        let ctx = EventContext::new("observatory_log", Utc::now());
        let point = event_point(&ctx, "dome_shutter_parked", "Dome parked", "Dome parked");
        assert_eq!(point.measurement(), "observatory_log");
    }
}
