//! HTTP ingress for the imaging host. Each route republishes onto the
//! matching mediator; nothing here talks to InfluxDB directly.

use crate::config::Observer;
use crate::devices::{DeviceClass, UnknownDeviceClass};
use crate::dispatch::{ConnectionStatus, Dispatcher};
use crate::hub::EquipmentHub;
use crate::metric::CustomMetric;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone)]
pub struct BridgeState {
    pub hub: EquipmentHub,
    pub dispatcher: Dispatcher,
}

#[derive(Debug, Serialize)]
struct Accepted {
    delivered: usize,
}

#[derive(Debug, Serialize)]
struct MetricResponse {
    accepted: bool,
    issues: Vec<String>,
    skipped_entities: usize,
}

#[derive(Debug, Deserialize)]
struct ProfileRequest {
    profile_name: String,
    #[serde(default)]
    observer: Option<Observer>,
}

#[derive(Debug, Serialize)]
struct ProfileResponse {
    profile_name: String,
    observer: ObserverBody,
}

#[derive(Debug, Serialize)]
struct ObserverBody {
    latitude: f64,
    longitude: f64,
    elevation: f64,
}

type ApiError = (StatusCode, String);

async fn healthz() -> &'static str {
    "ok"
}

async fn post_device_message(
    State(state): State<BridgeState>,
    Path(category): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Accepted>), ApiError> {
    let class: DeviceClass = category
        .parse()
        .map_err(|err: UnknownDeviceClass| (StatusCode::NOT_FOUND, err.to_string()))?;
    let delivered = state
        .hub
        .publish_json(class, body)
        .map_err(|err| (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()))?;
    tracing::trace!(category = %class, delivered, "device message published");
    Ok((StatusCode::ACCEPTED, Json(Accepted { delivered })))
}

async fn post_image(
    State(state): State<BridgeState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Accepted>), ApiError> {
    let delivered = state
        .hub
        .publish_image(body)
        .map_err(|err| (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()))?;
    Ok((StatusCode::ACCEPTED, Json(Accepted { delivered })))
}

async fn post_metric(
    State(state): State<BridgeState>,
    Json(metric): Json<CustomMetric>,
) -> (StatusCode, Json<MetricResponse>) {
    let skipped_entities = metric.incomplete_entities();
    let mut issues = metric.validate();
    if issues.is_empty() {
        match metric.to_point(Utc::now()) {
            Ok(point) => {
                state.dispatcher.spawn(vec![point], None);
                let body = MetricResponse {
                    accepted: true,
                    issues,
                    skipped_entities,
                };
                return (StatusCode::ACCEPTED, Json(body));
            }
            Err(err) => issues.push(err.to_string()),
        }
    }

    tracing::warn!(measurement = %metric.measurement, ?issues, "custom metric rejected");
    let body = MetricResponse {
        accepted: false,
        issues,
        skipped_entities,
    };
    (StatusCode::UNPROCESSABLE_ENTITY, Json(body))
}

async fn put_profile(
    State(state): State<BridgeState>,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    if let Some(observer) = &request.observer {
        if !(-90.0..=90.0).contains(&observer.latitude) || !observer.longitude.is_finite() {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("invalid observer location {observer:?}"),
            ));
        }
    }

    let config = state.dispatcher.config_store().update(|config| {
        config.profile_name = request.profile_name.trim().to_string();
        if let Some(observer) = request.observer {
            config.observer = observer;
        }
    });
    tracing::info!(profile = %config.profile_name, "profile changed");

    let dispatcher = state.dispatcher.clone();
    state.dispatcher.runtime().spawn(async move {
        dispatcher.check_connection().await;
    });

    Ok(Json(ProfileResponse {
        profile_name: config.profile_name.clone(),
        observer: ObserverBody {
            latitude: config.observer.latitude,
            longitude: config.observer.longitude,
            elevation: config.observer.elevation,
        },
    }))
}

async fn get_connection(State(state): State<BridgeState>) -> Json<ConnectionStatus> {
    Json(state.dispatcher.check_connection().await)
}

pub fn router(state: BridgeState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/devices/{category}", post(post_device_message))
        .route("/v1/images", post(post_image))
        .route("/v1/metrics", post(post_metric))
        .route("/v1/profile", put(put_profile))
        .route("/v1/connection", get(get_connection))
        .with_state(state)
}
