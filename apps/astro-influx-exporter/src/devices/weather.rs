use crate::devices::{DeviceClass, NoEvent};
use crate::listener::DeviceCategory;
use crate::schema::{Metric, Reading, Snapshot};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct WeatherSnapshot {
    pub connected: bool,
    pub name: String,
    pub cloud_cover: Option<f64>,
    pub dew_point: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub rain_rate: Option<f64>,
    pub sky_brightness: Option<f64>,
    pub sky_quality: Option<f64>,
    pub sky_temperature: Option<f64>,
    pub star_fwhm: Option<f64>,
    pub temperature: Option<f64>,
    pub wind_direction: Option<f64>,
    pub wind_gust: Option<f64>,
    pub wind_speed: Option<f64>,
}

impl Snapshot for WeatherSnapshot {
    fn connected(&self) -> bool {
        self.connected
    }

    fn device_name(&self) -> &str {
        &self.name
    }
}

pub struct Weather;

impl DeviceCategory for Weather {
    const CLASS: DeviceClass = DeviceClass::Weather;
    type Snapshot = WeatherSnapshot;
    type Event = NoEvent;
    type State = ();

    const METRICS: &'static [Metric<WeatherSnapshot>] = &[
        Metric {
            measurement: "wx_cloud_cover",
            read: |s| Reading::Float(s.cloud_cover),
        },
        Metric {
            measurement: "wx_dewpoint",
            read: |s| Reading::Float(s.dew_point),
        },
        Metric {
            measurement: "wx_humidity",
            read: |s| Reading::Float(s.humidity),
        },
        Metric {
            measurement: "wx_pressure",
            read: |s| Reading::Float(s.pressure),
        },
        Metric {
            measurement: "wx_rain_rate",
            read: |s| Reading::Float(s.rain_rate),
        },
        Metric {
            measurement: "wx_sky_brightness",
            read: |s| Reading::Float(s.sky_brightness),
        },
        Metric {
            measurement: "wx_sky_quality",
            read: |s| Reading::Float(s.sky_quality),
        },
        Metric {
            measurement: "wx_sky_temperature",
            read: |s| Reading::Float(s.sky_temperature),
        },
        Metric {
            measurement: "wx_star_fwhm",
            read: |s| Reading::Float(s.star_fwhm),
        },
        Metric {
            measurement: "wx_temperature",
            read: |s| Reading::Float(s.temperature),
        },
        Metric {
            measurement: "wx_wind_direction",
            read: |s| Reading::Float(s.wind_direction),
        },
        Metric {
            measurement: "wx_wind_gust",
            read: |s| Reading::Float(s.wind_gust),
        },
        Metric {
            measurement: "wx_wind_speed",
            read: |s| Reading::Float(s.wind_speed),
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::build_snapshot_points;
    use chrono::Utc;

    fn clear_night(connected: bool) -> WeatherSnapshot {
        WeatherSnapshot {
            connected,
            name: "AAG CloudWatcher".to_string(),
            cloud_cover: Some(3.0),
            humidity: Some(61.0),
            sky_quality: Some(21.3),
            temperature: Some(8.4),
            wind_speed: Some(2.2),
            ..WeatherSnapshot::default()
        }
    }

    #[test]
    fn disconnected_station_yields_nothing() {
        assert!(build_snapshot_points(&clear_night(false), Weather::METRICS, Utc::now()).is_empty());
    }

    #[test]
    fn every_reading_is_reported() {
        let points = build_snapshot_points(&clear_night(true), Weather::METRICS, Utc::now());
        assert_eq!(points.len(), 13);
        assert_eq!(points[0].measurement(), "wx_cloud_cover");
        assert_eq!(points[12].measurement(), "wx_wind_speed");
    }
}
