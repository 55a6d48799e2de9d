use crate::devices::{DeviceClass, NoEvent};
use crate::listener::DeviceCategory;
use crate::schema::{Metric, Reading, Snapshot};
use serde::Deserialize;

/// Current guiding RMS error, per axis and total, in arcseconds and pixels.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct GuiderSnapshot {
    pub connected: bool,
    pub name: String,
    pub rms_ra_arcsec: Option<f64>,
    pub rms_ra_pixel: Option<f64>,
    pub rms_dec_arcsec: Option<f64>,
    pub rms_dec_pixel: Option<f64>,
    pub rms_total_arcsec: Option<f64>,
    pub rms_total_pixel: Option<f64>,
}

impl Snapshot for GuiderSnapshot {
    fn connected(&self) -> bool {
        self.connected
    }

    fn device_name(&self) -> &str {
        &self.name
    }
}

pub struct Guider;

impl DeviceCategory for Guider {
    const CLASS: DeviceClass = DeviceClass::Guider;
    type Snapshot = GuiderSnapshot;
    type Event = NoEvent;
    type State = ();

    const METRICS: &'static [Metric<GuiderSnapshot>] = &[
        Metric {
            measurement: "guider_err_ra_arcsec",
            read: |s| Reading::Float(s.rms_ra_arcsec),
        },
        Metric {
            measurement: "guider_err_ra_pixel",
            read: |s| Reading::Float(s.rms_ra_pixel),
        },
        Metric {
            measurement: "guider_err_dec_arcsec",
            read: |s| Reading::Float(s.rms_dec_arcsec),
        },
        Metric {
            measurement: "guider_err_dec_pixel",
            read: |s| Reading::Float(s.rms_dec_pixel),
        },
        Metric {
            measurement: "guider_err_total_arcsec",
            read: |s| Reading::Float(s.rms_total_arcsec),
        },
        Metric {
            measurement: "guider_err_total_pixel",
            read: |s| Reading::Float(s.rms_total_pixel),
        },
    ];
}
