//! Low-precision sun and moon positions, good to a few arcminutes.
//!
//! Sun: the Astronomical Almanac's low-precision formulae. Moon: Schlyter's
//! orbital elements with the main perturbation terms and a topocentric
//! parallax correction. Altitudes are geometric (no refraction).

use crate::config::Observer;
use chrono::{DateTime, Utc};

const J2000: f64 = 2_451_545.0;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const EARTH_EQUATORIAL_RADIUS_M: f64 = 6_378_137.0;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Equatorial {
    /// Right ascension, degrees.
    ra: f64,
    /// Declination, degrees.
    dec: f64,
}

pub fn julian_day(ts: DateTime<Utc>) -> f64 {
    let seconds = ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_nanos()) * 1e-9;
    seconds / 86_400.0 + UNIX_EPOCH_JD
}

fn normalize_degrees(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

fn sin_d(deg: f64) -> f64 {
    deg.to_radians().sin()
}

fn cos_d(deg: f64) -> f64 {
    deg.to_radians().cos()
}

/// Greenwich mean sidereal time in degrees.
fn gmst_degrees(jd: f64) -> f64 {
    normalize_degrees(280.460_618_37 + 360.985_647_366_29 * (jd - J2000))
}

fn obliquity_degrees(days: f64) -> f64 {
    23.439 - 0.000_000_4 * days
}

fn altitude(position: Equatorial, jd: f64, observer: &Observer) -> f64 {
    let lst = gmst_degrees(jd) + observer.longitude;
    let hour_angle = normalize_degrees(lst - position.ra);
    let lat = observer.latitude;
    let sin_alt = sin_d(lat) * sin_d(position.dec) + cos_d(lat) * cos_d(position.dec) * cos_d(hour_angle);
    sin_alt.clamp(-1.0, 1.0).asin().to_degrees()
}

fn sun_position(jd: f64) -> Equatorial {
    let d = jd - J2000;
    let mean_anomaly = normalize_degrees(357.529 + 0.985_600_28 * d);
    let mean_longitude = normalize_degrees(280.459 + 0.985_647_36 * d);
    let longitude = mean_longitude
        + 1.915 * sin_d(mean_anomaly)
        + 0.020 * sin_d(2.0 * mean_anomaly);
    let obliquity = obliquity_degrees(d);

    let ra = (cos_d(obliquity) * sin_d(longitude))
        .atan2(cos_d(longitude))
        .to_degrees();
    let dec = (sin_d(obliquity) * sin_d(longitude)).asin().to_degrees();
    Equatorial {
        ra: normalize_degrees(ra),
        dec,
    }
}

/// Geocentric moon position plus distance in Earth radii.
fn moon_position(jd: f64) -> (Equatorial, f64) {
    // Schlyter's day number counts from 1999-12-31 0h UT.
    let d = jd - 2_451_543.5;

    let node = normalize_degrees(125.1228 - 0.052_953_808_3 * d);
    let inclination = 5.1454_f64;
    let perigee = normalize_degrees(318.0634 + 0.164_357_322_3 * d);
    let semi_major = 60.2666_f64;
    let ecc = 0.054_900_f64;
    let mean_anomaly = normalize_degrees(115.3654 + 13.064_992_950_9 * d);

    let mut eccentric = mean_anomaly
        + ecc.to_degrees() * sin_d(mean_anomaly) * (1.0 + ecc * cos_d(mean_anomaly));
    for _ in 0..5 {
        let delta = (eccentric - ecc.to_degrees() * sin_d(eccentric) - mean_anomaly)
            / (1.0 - ecc * cos_d(eccentric));
        eccentric -= delta;
        if delta.abs() < 1e-6 {
            break;
        }
    }

    let xv = semi_major * (cos_d(eccentric) - ecc);
    let yv = semi_major * (1.0 - ecc * ecc).sqrt() * sin_d(eccentric);
    let true_anomaly = yv.atan2(xv).to_degrees();
    let mut distance = (xv * xv + yv * yv).sqrt();

    let arg = true_anomaly + perigee;
    let xh = distance * (cos_d(node) * cos_d(arg) - sin_d(node) * sin_d(arg) * cos_d(inclination));
    let yh = distance * (sin_d(node) * cos_d(arg) + cos_d(node) * sin_d(arg) * cos_d(inclination));
    let zh = distance * sin_d(arg) * sin_d(inclination);
    let mut longitude = yh.atan2(xh).to_degrees();
    let mut latitude = zh.atan2((xh * xh + yh * yh).sqrt()).to_degrees();

    let sun_anomaly = normalize_degrees(356.0470 + 0.985_600_258_5 * d);
    let sun_perihelion = 282.9404 + 4.709_35e-5 * d;
    let sun_longitude = sun_anomaly + sun_perihelion;
    let moon_longitude = node + perigee + mean_anomaly;
    let elongation = moon_longitude - sun_longitude;
    let latitude_arg = moon_longitude - node;
    let (m, ms, de, f) = (mean_anomaly, sun_anomaly, elongation, latitude_arg);

    longitude += -1.274 * sin_d(m - 2.0 * de)
        + 0.658 * sin_d(2.0 * de)
        - 0.186 * sin_d(ms)
        - 0.059 * sin_d(2.0 * m - 2.0 * de)
        - 0.057 * sin_d(m - 2.0 * de + ms)
        + 0.053 * sin_d(m + 2.0 * de)
        + 0.046 * sin_d(2.0 * de - ms)
        + 0.041 * sin_d(m - ms)
        - 0.035 * sin_d(de)
        - 0.031 * sin_d(m + ms)
        - 0.015 * sin_d(2.0 * f - 2.0 * de)
        + 0.011 * sin_d(m - 4.0 * de);
    latitude += -0.173 * sin_d(f - 2.0 * de)
        - 0.055 * sin_d(m - f - 2.0 * de)
        - 0.046 * sin_d(m + f - 2.0 * de)
        + 0.033 * sin_d(f + 2.0 * de)
        + 0.017 * sin_d(2.0 * m + f);
    distance += -0.58 * cos_d(m - 2.0 * de) - 0.46 * cos_d(2.0 * de);

    let obliquity = 23.4393 - 3.563e-7 * d;
    let xg = cos_d(longitude) * cos_d(latitude);
    let yg = sin_d(longitude) * cos_d(latitude);
    let zg = sin_d(latitude);
    let ye = yg * cos_d(obliquity) - zg * sin_d(obliquity);
    let ze = yg * sin_d(obliquity) + zg * cos_d(obliquity);

    let ra = normalize_degrees(ye.atan2(xg).to_degrees());
    let dec = ze.atan2((xg * xg + ye * ye).sqrt()).to_degrees();
    (Equatorial { ra, dec }, distance)
}

/// Geometric altitude of the sun's centre, degrees.
pub fn sun_altitude(ts: DateTime<Utc>, observer: &Observer) -> f64 {
    let jd = julian_day(ts);
    altitude(sun_position(jd), jd, observer)
}

/// Topocentric altitude of the moon's centre, degrees.
pub fn moon_altitude(ts: DateTime<Utc>, observer: &Observer) -> f64 {
    let jd = julian_day(ts);
    let (position, distance) = moon_position(jd);
    let geocentric = altitude(position, jd, observer);

    let observer_radius = 1.0 + observer.elevation / EARTH_EQUATORIAL_RADIUS_M;
    let parallax = (observer_radius / distance).clamp(-1.0, 1.0).asin().to_degrees();
    geocentric - parallax * cos_d(geocentric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn julian_day_of_j2000() {
        let jd = julian_day(utc(2000, 1, 1, 12, 0));
        assert!((jd - J2000).abs() < 1e-9);
    }

    #[test]
    fn equinox_sun_over_the_equator() {
        let null_island = Observer::default();
        let noon = sun_altitude(utc(2024, 3, 20, 12, 7), &null_island);
        let midnight = sun_altitude(utc(2024, 3, 20, 0, 7), &null_island);
        assert!(noon > 88.0, "noon altitude {noon}");
        assert!(midnight < -88.0, "midnight altitude {midnight}");
    }

    #[test]
    fn total_eclipse_over_dallas() {
        let dallas = Observer {
            latitude: 32.78,
            longitude: -96.80,
            elevation: 140.0,
        };
        let totality = utc(2024, 4, 8, 18, 42);
        let sun = sun_altitude(totality, &dallas);
        let moon = moon_altitude(totality, &dallas);

        assert!((60.0..68.0).contains(&sun), "sun altitude {sun}");
        assert!((moon - sun).abs() < 1.0, "sun {sun} moon {moon}");
    }

    #[test]
    fn altitudes_stay_in_range() {
        let observer = Observer {
            latitude: -89.9,
            longitude: 179.9,
            elevation: 3000.0,
        };
        for hour in 0..24 {
            let ts = utc(2025, 6, 21, hour, 0);
            for alt in [sun_altitude(ts, &observer), moon_altitude(ts, &observer)] {
                assert!(alt.is_finite());
                assert!((-91.0..=91.0).contains(&alt));
            }
        }
    }
}
