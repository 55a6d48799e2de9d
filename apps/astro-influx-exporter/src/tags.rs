use crate::config::ExporterConfig;
use crate::devices::DeviceClass;
use crate::point::Point;

/// The device a batch was produced for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Equipment {
    pub class: DeviceClass,
    pub name: String,
}

impl Equipment {
    pub fn new(class: DeviceClass, name: impl Into<String>) -> Self {
        Self {
            class,
            name: name.into(),
        }
    }
}

/// Default tags resolved from one configuration snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefaultTags {
    tags: Vec<(String, String)>,
}

impl DefaultTags {
    pub fn from_config(config: &ExporterConfig, equipment: Option<&Equipment>) -> Self {
        let mut tags = Vec::new();
        let mut push = |enabled: bool, key: String, value: &str| {
            let value = value.trim();
            if enabled && !value.is_empty() {
                tags.push((key, value.to_string()));
            }
        };

        push(config.tag_hostname, "host_name".to_string(), &config.host_name);
        push(
            config.tag_profile_name,
            "profile_name".to_string(),
            &config.profile_name,
        );
        if let Some(equipment) = equipment {
            push(
                config.tag_equipment_name,
                equipment.class.tag_key(),
                &equipment.name,
            );
        }

        Self { tags }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tags are keyed, so applying twice leaves the same set as applying once.
    pub fn apply(&self, points: &mut [Point]) {
        for point in points.iter_mut() {
            for (key, value) in &self.tags {
                point.insert_tag(key.as_str(), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: bool, profile: bool, equipment: bool) -> ExporterConfig {
        ExporterConfig {
            tag_hostname: host,
            tag_profile_name: profile,
            tag_equipment_name: equipment,
            host_name: "obs-pc".to_string(),
            profile_name: "Backyard".to_string(),
            ..ExporterConfig::default()
        }
    }

    fn batch() -> Vec<Point> {
        vec![
            Point::new("camera_sensor_temperature").field("value", -10.0),
            Point::new("camera_cooler_power").field("value", 40.0),
        ]
    }

    #[test]
    fn flags_are_independent() {
        let camera = Equipment::new(DeviceClass::Camera, "ZWO ASI294MM");
        let mut points = batch();
        DefaultTags::from_config(&config(false, true, true), Some(&camera)).apply(&mut points);

        for point in &points {
            assert_eq!(point.tag_value("host_name"), None);
            assert_eq!(point.tag_value("profile_name"), Some("Backyard"));
            assert_eq!(point.tag_value("camera_name"), Some("ZWO ASI294MM"));
        }
    }

    #[test]
    fn applying_twice_matches_applying_once() {
        let mount = Equipment::new(DeviceClass::Mount, "EQ6-R");
        let tags = DefaultTags::from_config(&config(true, true, true), Some(&mount));

        let mut once = batch();
        tags.apply(&mut once);
        let mut twice = batch();
        tags.apply(&mut twice);
        tags.apply(&mut twice);

        assert_eq!(once, twice);
        assert_eq!(twice[0].tags().len(), 3);
    }

    #[test]
    fn empty_values_are_skipped() {
        let nameless = Equipment::new(DeviceClass::Focuser, "");
        let mut cfg = config(true, true, true);
        cfg.profile_name.clear();
        let tags = DefaultTags::from_config(&cfg, Some(&nameless));

        let mut points = batch();
        tags.apply(&mut points);
        assert_eq!(points[0].tag_value("profile_name"), None);
        assert_eq!(points[0].tag_value("focuser_name"), None);
        assert_eq!(points[0].tag_value("host_name"), Some("obs-pc"));
    }

    #[test]
    fn no_equipment_means_no_equipment_tag() {
        let tags = DefaultTags::from_config(&config(false, false, true), None);
        assert!(tags.is_empty());
    }
}
