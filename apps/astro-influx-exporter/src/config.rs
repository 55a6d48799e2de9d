use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const DEFAULT_EVENT_MEASUREMENT: &str = "events";
const DEFAULT_HTTP_BIND: &str = "127.0.0.1:9280";
const DEFAULT_SAMPLER_INTERVAL_SECS: u64 = 60;
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5_000;

/// Observing site used for the ephemeris sampler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Observer {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
}

#[derive(Clone, Debug)]
pub struct ExporterConfig {
    pub influxdb_url: String,
    pub influxdb_token: String,
    pub influxdb_org_id: String,
    pub influxdb_bucket: String,
    pub tag_hostname: bool,
    pub tag_profile_name: bool,
    pub tag_equipment_name: bool,
    pub tag_image_file_name: bool,
    pub tag_full_image_path: bool,
    pub host_name: String,
    pub profile_name: String,
    pub event_measurement: String,
    pub observer: Observer,
    pub sampler_interval_secs: u64,
    pub write_timeout_ms: u64,
    pub http_bind: String,
    pub otlp_endpoint: Option<String>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            influxdb_url: String::new(),
            influxdb_token: String::new(),
            influxdb_org_id: String::new(),
            influxdb_bucket: String::new(),
            tag_hostname: false,
            tag_profile_name: false,
            tag_equipment_name: false,
            tag_image_file_name: false,
            tag_full_image_path: false,
            host_name: String::new(),
            profile_name: String::new(),
            event_measurement: DEFAULT_EVENT_MEASUREMENT.to_string(),
            observer: Observer::default(),
            sampler_interval_secs: DEFAULT_SAMPLER_INTERVAL_SECS,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            http_bind: DEFAULT_HTTP_BIND.to_string(),
            otlp_endpoint: None,
        }
    }
}

impl ExporterConfig {
    /// Loads `.env`, the environment and the optional settings file. A
    /// settings file that cannot be used does not fail startup; its error is
    /// handed back so it can be logged once tracing is up.
    pub fn from_env() -> Result<(Self, Option<anyhow::Error>)> {
        dotenv().ok();

        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.host_name = local_host_name();

        let mut settings_error = None;
        if let Some(path) = settings_path() {
            match load_settings_overrides(&path) {
                Ok(Some(overrides)) => {
                    apply_settings_overrides(&mut config, &overrides, |key| env_is_set(key))
                }
                Ok(None) => {}
                Err(err) => settings_error = Some(err),
            }
        }

        Ok((config, settings_error))
    }

    /// Builds a config from an arbitrary key lookup. Missing keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let get_bool = |key: &str| -> bool {
            get(key)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };
        let get_u64 = |key: &str, default: u64| -> Result<u64> {
            match get(key) {
                Some(raw) => raw.parse::<u64>().with_context(|| format!("invalid {key}")),
                None => Ok(default),
            }
        };
        let get_f64 = |key: &str| -> Result<f64> {
            match get(key) {
                Some(raw) => {
                    let value = raw.parse::<f64>().with_context(|| format!("invalid {key}"))?;
                    if !value.is_finite() {
                        return Err(anyhow!("{key} must be a finite number"));
                    }
                    Ok(value)
                }
                None => Ok(0.0),
            }
        };

        let observer = Observer {
            latitude: get_f64("EXPORTER_OBSERVER_LATITUDE")?,
            longitude: get_f64("EXPORTER_OBSERVER_LONGITUDE")?,
            elevation: get_f64("EXPORTER_OBSERVER_ELEVATION")?,
        };
        if !(-90.0..=90.0).contains(&observer.latitude) {
            return Err(anyhow!("EXPORTER_OBSERVER_LATITUDE must be within [-90, 90]"));
        }

        Ok(Self {
            influxdb_url: get("INFLUXDB_URL").unwrap_or_default(),
            influxdb_token: get("INFLUXDB_TOKEN").unwrap_or_default(),
            influxdb_org_id: get("INFLUXDB_ORG_ID").unwrap_or_default(),
            influxdb_bucket: get("INFLUXDB_BUCKET").unwrap_or_default(),
            tag_hostname: get_bool("EXPORTER_TAG_HOSTNAME"),
            tag_profile_name: get_bool("EXPORTER_TAG_PROFILE_NAME"),
            tag_equipment_name: get_bool("EXPORTER_TAG_EQUIPMENT_NAME"),
            tag_image_file_name: get_bool("EXPORTER_TAG_IMAGE_FILE_NAME"),
            tag_full_image_path: get_bool("EXPORTER_TAG_FULL_IMAGE_PATH"),
            host_name: String::new(),
            profile_name: get("EXPORTER_PROFILE_NAME").unwrap_or_default(),
            event_measurement: get("EXPORTER_EVENT_MEASUREMENT")
                .unwrap_or_else(|| DEFAULT_EVENT_MEASUREMENT.to_string()),
            observer,
            sampler_interval_secs: get_u64(
                "EXPORTER_SAMPLER_INTERVAL_SECS",
                DEFAULT_SAMPLER_INTERVAL_SECS,
            )?
            .max(1),
            write_timeout_ms: get_u64("EXPORTER_WRITE_TIMEOUT_MS", DEFAULT_WRITE_TIMEOUT_MS)?
                .max(1),
            http_bind: get("EXPORTER_HTTP_BIND").unwrap_or_else(|| DEFAULT_HTTP_BIND.to_string()),
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// A write is only attempted when every connection parameter is present.
    pub fn is_valid(&self) -> bool {
        [
            &self.influxdb_url,
            &self.influxdb_token,
            &self.influxdb_org_id,
            &self.influxdb_bucket,
        ]
        .iter()
        .all(|value| !value.trim().is_empty())
    }

    pub fn sampler_interval(&self) -> Duration {
        Duration::from_secs(self.sampler_interval_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

fn local_host_name() -> String {
    sysinfo::System::host_name().unwrap_or_default()
}

fn env_is_set(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .is_some()
}

fn settings_path() -> Option<PathBuf> {
    let path = std::env::var("EXPORTER_SETTINGS_PATH").ok()?;
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

/// Values from the settings file written by the host's options screen.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsOverrides {
    #[serde(default)]
    pub influxdb_url: Option<String>,
    #[serde(default)]
    pub influxdb_token: Option<String>,
    #[serde(default)]
    pub influxdb_org_id: Option<String>,
    #[serde(default)]
    pub influxdb_bucket: Option<String>,
    #[serde(default)]
    pub tag_hostname: Option<bool>,
    #[serde(default)]
    pub tag_profile_name: Option<bool>,
    #[serde(default)]
    pub tag_equipment_name: Option<bool>,
    #[serde(default)]
    pub tag_image_file_name: Option<bool>,
    #[serde(default)]
    pub tag_full_image_path: Option<bool>,
    #[serde(default)]
    pub profile_name: Option<String>,
    #[serde(default)]
    pub event_measurement: Option<String>,
    #[serde(default)]
    pub observer: Option<Observer>,
}

/// `Ok(None)` when the file does not exist.
pub fn load_settings_overrides(path: &Path) -> Result<Option<SettingsOverrides>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exporter settings {}", path.display()))?;
    let mut bytes = contents.into_bytes();
    let overrides = simd_json::serde::from_slice(&mut bytes)
        .with_context(|| format!("failed to parse exporter settings {}", path.display()))?;
    Ok(Some(overrides))
}

/// Applies settings file values wherever the matching env var is unset.
pub fn apply_settings_overrides(
    config: &mut ExporterConfig,
    overrides: &SettingsOverrides,
    env_is_set: impl Fn(&str) -> bool,
) {
    let text = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let strings = [
        ("INFLUXDB_URL", &overrides.influxdb_url, &mut config.influxdb_url),
        ("INFLUXDB_TOKEN", &overrides.influxdb_token, &mut config.influxdb_token),
        ("INFLUXDB_ORG_ID", &overrides.influxdb_org_id, &mut config.influxdb_org_id),
        ("INFLUXDB_BUCKET", &overrides.influxdb_bucket, &mut config.influxdb_bucket),
        ("EXPORTER_PROFILE_NAME", &overrides.profile_name, &mut config.profile_name),
        (
            "EXPORTER_EVENT_MEASUREMENT",
            &overrides.event_measurement,
            &mut config.event_measurement,
        ),
    ];
    for (key, value, target) in strings {
        if env_is_set(key) {
            continue;
        }
        if let Some(value) = text(value) {
            *target = value;
        }
    }

    let flags = [
        ("EXPORTER_TAG_HOSTNAME", overrides.tag_hostname, &mut config.tag_hostname),
        (
            "EXPORTER_TAG_PROFILE_NAME",
            overrides.tag_profile_name,
            &mut config.tag_profile_name,
        ),
        (
            "EXPORTER_TAG_EQUIPMENT_NAME",
            overrides.tag_equipment_name,
            &mut config.tag_equipment_name,
        ),
        (
            "EXPORTER_TAG_IMAGE_FILE_NAME",
            overrides.tag_image_file_name,
            &mut config.tag_image_file_name,
        ),
        (
            "EXPORTER_TAG_FULL_IMAGE_PATH",
            overrides.tag_full_image_path,
            &mut config.tag_full_image_path,
        ),
    ];
    for (key, value, target) in flags {
        if env_is_set(key) {
            continue;
        }
        if let Some(value) = value {
            *target = value;
        }
    }

    let observer_from_env = ["EXPORTER_OBSERVER_LATITUDE", "EXPORTER_OBSERVER_LONGITUDE"]
        .iter()
        .any(|key| env_is_set(key));
    if !observer_from_env {
        if let Some(observer) = overrides.observer {
            config.observer = observer;
        }
    }
}

/// Shared, swappable configuration. Readers take a snapshot per write so a
/// profile change never tears a write in flight.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    inner: Arc<RwLock<Arc<ExporterConfig>>>,
}

impl ConfigStore {
    pub fn new(config: ExporterConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    pub fn snapshot(&self) -> Arc<ExporterConfig> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, config: ExporterConfig) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(config);
    }

    /// Applies `change` to a copy of the current config and publishes the result.
    pub fn update(&self, change: impl FnOnce(&mut ExporterConfig)) -> Arc<ExporterConfig> {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next = ExporterConfig::clone(&guard);
        change(&mut next);
        let next = Arc::new(next);
        *guard = next.clone();
        next
    }
}
