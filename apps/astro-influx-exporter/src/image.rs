use crate::config::ExporterConfig;
use crate::dispatch::Dispatcher;
use crate::mediator::{Mediator, Subscription};
use crate::point::{Point, Precision};
use crate::schema::{sanitize_float, Metric, Reading, SENTINEL_FLOAT};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImageStatistics {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
    pub mad: Option<f64>,
    pub min_adu: Option<i64>,
    pub min_adu_count: Option<i64>,
    pub max_adu: Option<i64>,
    pub max_adu_count: Option<i64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StarAnalysis {
    pub hfr: Option<f64>,
    pub hfr_std_dev: Option<f64>,
    pub star_count: Option<i64>,
    pub fwhm: Option<f64>,
    pub eccentricity: Option<f64>,
}

/// Guiding RMS recorded over the exposure, in arcseconds.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecordedRms {
    pub ra: Option<f64>,
    pub dec: Option<f64>,
    pub total: Option<f64>,
    pub peak_ra: Option<f64>,
    pub peak_dec: Option<f64>,
}

impl RecordedRms {
    /// Combined RMS; only meaningful when both axes are known.
    pub fn combined(&self) -> f64 {
        match (self.ra, self.dec) {
            (Some(ra), Some(dec)) if ra.is_finite() && dec.is_finite() => ra.hypot(dec),
            _ => SENTINEL_FLOAT,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImageSavedEvent {
    pub path: String,
    pub exposure_start: Option<DateTime<Utc>>,
    pub statistics: Option<ImageStatistics>,
    pub star_analysis: Option<StarAnalysis>,
    pub recorded_rms: Option<RecordedRms>,
    pub target_name: String,
    pub sequence_title: String,
    pub camera_name: String,
    pub readout_mode: String,
    pub filter_name: String,
}

impl ImageSavedEvent {
    fn stat<T>(&self, read: impl Fn(&ImageStatistics) -> Option<T>) -> Option<T> {
        self.statistics.as_ref().and_then(read)
    }

    fn star<T>(&self, read: impl Fn(&StarAnalysis) -> Option<T>) -> Option<T> {
        self.star_analysis.as_ref().and_then(read)
    }

    fn rms<T>(&self, read: impl Fn(&RecordedRms) -> Option<T>) -> Option<T> {
        self.recorded_rms.as_ref().and_then(read)
    }
}

const IMAGE_METRICS: &[Metric<ImageSavedEvent>] = &[
    Metric {
        measurement: "image_mean",
        read: |e| Reading::Float(e.stat(|s| s.mean)),
    },
    Metric {
        measurement: "image_median",
        read: |e| Reading::Float(e.stat(|s| s.median)),
    },
    Metric {
        measurement: "image_std_deviation",
        read: |e| Reading::Float(e.stat(|s| s.std_dev)),
    },
    Metric {
        measurement: "image_mad",
        read: |e| Reading::Float(e.stat(|s| s.mad)),
    },
    Metric {
        measurement: "image_min_adu",
        read: |e| Reading::Count(e.stat(|s| s.min_adu)),
    },
    Metric {
        measurement: "image_min_adu_count",
        read: |e| Reading::Count(e.stat(|s| s.min_adu_count)),
    },
    Metric {
        measurement: "image_max_adu",
        read: |e| Reading::Count(e.stat(|s| s.max_adu)),
    },
    Metric {
        measurement: "image_max_adu_count",
        read: |e| Reading::Count(e.stat(|s| s.max_adu_count)),
    },
    Metric {
        measurement: "image_hfr",
        read: |e| Reading::Float(e.star(|s| s.hfr)),
    },
    Metric {
        measurement: "image_hfr_std_deviation",
        read: |e| Reading::Float(e.star(|s| s.hfr_std_dev)),
    },
    Metric {
        measurement: "image_star_count",
        read: |e| Reading::Count(e.star(|s| s.star_count)),
    },
    Metric {
        measurement: "image_rms_avg_ra_arcsec",
        read: |e| Reading::Float(e.rms(|r| r.ra)),
    },
    Metric {
        measurement: "image_rms_avg_dec_arcsec",
        read: |e| Reading::Float(e.rms(|r| r.dec)),
    },
    Metric {
        measurement: "image_rms_avg_arcsec",
        read: |e| Reading::Float(e.recorded_rms.as_ref().map(RecordedRms::combined)),
    },
    Metric {
        measurement: "image_rms_peak_ra_arcsec",
        read: |e| Reading::Float(e.rms(|r| r.peak_ra)),
    },
    Metric {
        measurement: "image_rms_peak_dec_arcsec",
        read: |e| Reading::Float(e.rms(|r| r.peak_dec)),
    },
    Metric {
        measurement: "image_rms_peak_arcsec",
        read: |e| Reading::Float(e.rms(|r| r.total)),
    },
];

fn image_file_tag(path: &str, full_path: bool) -> &str {
    let path = path.trim();
    if full_path {
        return path;
    }
    // Hosts may run on Windows, so split on either separator.
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Points for one saved exposure, timestamped at exposure start.
pub fn image_points(event: &ImageSavedEvent, config: &ExporterConfig, now: DateTime<Utc>) -> Vec<Point> {
    let timestamp = event.exposure_start.unwrap_or(now);

    let mut points: Vec<Point> = IMAGE_METRICS
        .iter()
        .map(|metric| {
            Point::new(metric.measurement).field("value", (metric.read)(event).sanitize())
        })
        .collect();

    let optional = [
        ("image_fwhm", event.star(|s| s.fwhm)),
        ("image_eccentricity", event.star(|s| s.eccentricity)),
    ];
    for (measurement, value) in optional {
        if value.is_some() {
            points.push(Point::new(measurement).field("value", sanitize_float(value)));
        }
    }

    let file_tag = if config.tag_image_file_name {
        image_file_tag(&event.path, config.tag_full_image_path)
    } else {
        ""
    };
    let metadata = [
        ("target_name", event.target_name.as_str()),
        ("sequence_title", event.sequence_title.as_str()),
        ("camera_name", event.camera_name.as_str()),
        ("readout_mode", event.readout_mode.as_str()),
        ("filter_name", event.filter_name.as_str()),
        ("image_file_name", file_tag),
    ];

    points
        .into_iter()
        .map(|point| {
            let mut point = point.timestamp(timestamp, Precision::Nanoseconds);
            for (key, value) in metadata {
                point.insert_tag(key, value);
            }
            point
        })
        .collect()
}

/// Writes image statistics for every exposure published on the image mediator.
pub struct ImageListener {
    subscription: Option<Subscription>,
}

impl ImageListener {
    pub fn attach(mediator: &Mediator<ImageSavedEvent>, dispatcher: Dispatcher) -> Self {
        let subscription = mediator.subscribe(move |event: &ImageSavedEvent| {
            let config = dispatcher.config();
            let points = image_points(event, &config, Utc::now());
            tracing::debug!(path = %event.path, points = points.len(), "image saved");
            dispatcher.spawn(points, None);
        });
        Self {
            subscription: Some(subscription),
        }
    }

    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::point::FieldValue;
    use crate::schema::SENTINEL_INT;
    use crate::test_support::{valid_config, SpySink};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn exposure() -> ImageSavedEvent {
        ImageSavedEvent {
            path: "C:\\Astro\\2024-03-01\\M42\\LIGHT_Ha_300s_0001.fits".to_string(),
            exposure_start: Some(Utc.with_ymd_and_hms(2024, 3, 1, 22, 15, 0).unwrap()),
            statistics: Some(ImageStatistics {
                mean: Some(1021.4),
                median: Some(1003.0),
                std_dev: Some(88.2),
                mad: Some(31.0),
                min_adu: Some(512),
                min_adu_count: Some(3),
                max_adu: Some(65535),
                max_adu_count: Some(40),
            }),
            star_analysis: Some(StarAnalysis {
                hfr: Some(2.31),
                hfr_std_dev: Some(0.4),
                star_count: Some(1450),
                fwhm: None,
                eccentricity: Some(0.42),
            }),
            recorded_rms: Some(RecordedRms {
                ra: Some(1.5),
                dec: Some(2.0),
                total: Some(2.6),
                peak_ra: Some(1.1),
                peak_dec: Some(f64::NAN),
            }),
            target_name: "M42".to_string(),
            sequence_title: "Orion narrowband".to_string(),
            camera_name: "ZWO ASI2600MM Pro".to_string(),
            readout_mode: String::new(),
            filter_name: "Ha".to_string(),
        }
    }

    fn value(points: &[Point], measurement: &str) -> Option<FieldValue> {
        points
            .iter()
            .find(|p| p.measurement() == measurement)
            .and_then(|p| p.field_value("value").cloned())
    }

    #[test]
    fn exposure_statistics_and_guiding() {
        let event = exposure();
        let points = image_points(&event, &valid_config(), Utc::now());

        assert_eq!(points.len(), 18);
        assert_eq!(value(&points, "image_max_adu"), Some(FieldValue::Integer(65535)));
        assert_eq!(value(&points, "image_star_count"), Some(FieldValue::Integer(1450)));
        assert_eq!(value(&points, "image_rms_avg_arcsec"), Some(FieldValue::Float(2.5)));
        assert_eq!(value(&points, "image_rms_peak_arcsec"), Some(FieldValue::Float(2.6)));
        assert_eq!(
            value(&points, "image_rms_peak_dec_arcsec"),
            Some(FieldValue::Float(SENTINEL_FLOAT))
        );
        assert_eq!(value(&points, "image_eccentricity"), Some(FieldValue::Float(0.42)));
        assert_eq!(value(&points, "image_fwhm"), None);
        assert!(points
            .iter()
            .all(|p| p.time() == event.exposure_start.unwrap()));
    }

    #[test]
    fn target_tag_only_when_named() {
        let mut event = exposure();
        let points = image_points(&event, &valid_config(), Utc::now());
        assert!(points.iter().all(|p| p.tag_value("target_name") == Some("M42")));
        assert!(points.iter().all(|p| p.tag_value("readout_mode").is_none()));

        event.target_name = String::new();
        let points = image_points(&event, &valid_config(), Utc::now());
        assert!(points.iter().all(|p| p.tag_value("target_name").is_none()));
        assert!(points
            .iter()
            .all(|p| p.tag_value("sequence_title") == Some("Orion narrowband")));
    }

    #[test]
    fn file_name_tag_follows_flags() {
        let event = exposure();
        let mut config = valid_config();

        let points = image_points(&event, &config, Utc::now());
        assert_eq!(points[0].tag_value("image_file_name"), None);

        config.tag_image_file_name = true;
        let points = image_points(&event, &config, Utc::now());
        assert_eq!(
            points[0].tag_value("image_file_name"),
            Some("LIGHT_Ha_300s_0001.fits")
        );

        config.tag_full_image_path = true;
        let points = image_points(&event, &config, Utc::now());
        assert_eq!(points[0].tag_value("image_file_name"), Some(event.path.as_str()));
    }

    #[test]
    fn missing_blocks_become_sentinels() {
        let event = ImageSavedEvent {
            path: "/data/flat_0001.fits".to_string(),
            ..ImageSavedEvent::default()
        };
        let now = Utc::now();
        let points = image_points(&event, &valid_config(), now);

        assert_eq!(points.len(), 17);
        assert_eq!(value(&points, "image_mean"), Some(FieldValue::Float(SENTINEL_FLOAT)));
        assert_eq!(value(&points, "image_min_adu"), Some(FieldValue::Integer(SENTINEL_INT)));
        assert_eq!(
            value(&points, "image_rms_avg_arcsec"),
            Some(FieldValue::Float(SENTINEL_FLOAT))
        );
        assert!(points.iter().all(|p| p.time() == now));
    }

    #[tokio::test]
    async fn listener_writes_each_exposure() {
        let sink = Arc::new(SpySink::default());
        let dispatcher = Dispatcher::new(
            sink.clone(),
            ConfigStore::new(valid_config()),
            tokio::runtime::Handle::current(),
        );
        let mediator = Mediator::new();
        let mut listener = ImageListener::attach(&mediator, dispatcher);

        mediator.publish(&exposure());
        sink.wait_for_calls(1).await;
        assert_eq!(sink.points().len(), 18);

        listener.detach();
        assert!(!listener.is_subscribed());
        assert_eq!(mediator.publish(&exposure()), 0);
    }
}
