use super::*;
use crate::config::{ConfigStore, ExporterConfig};
use crate::devices::DeviceClass;
use crate::test_support::{valid_config, SpySink};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

fn dispatcher(sink: Arc<SpySink>, config: ExporterConfig) -> Dispatcher {
    Dispatcher::new(sink, ConfigStore::new(config), Handle::current())
}

#[tokio::test(start_paused = true)]
async fn start_subscribes_every_mediator() {
    let hub = EquipmentHub::new();
    let sink = Arc::new(SpySink::default());
    let mut exporter = Exporter::start(&hub, dispatcher(sink.clone(), valid_config()));

    assert!(exporter.is_subscribed());
    assert_eq!(hub.subscriber_count(), DeviceClass::ALL.len() + 1);

    sink.wait_for_calls(1).await;
    assert_eq!(exporter.sampler_state(), SamplerState::Running);

    exporter.teardown().await;
    assert!(!exporter.is_subscribed());
    assert_eq!(hub.subscriber_count(), 0);
    assert_eq!(exporter.sampler_state(), SamplerState::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn nothing_is_written_after_teardown() {
    let hub = EquipmentHub::new();
    let sink = Arc::new(SpySink::default());
    let mut exporter = Exporter::start(&hub, dispatcher(sink.clone(), valid_config()));
    sink.wait_for_calls(1).await;

    exporter.teardown().await;
    exporter.teardown().await;

    let delivered = hub
        .publish_json(
            DeviceClass::Weather,
            json!({ "type": "info_updated", "snapshot": { "connected": true, "temperature": 4.5 } }),
        )
        .unwrap();
    assert_eq!(delivered, 0);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(sink.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn device_and_image_messages_are_exported() {
    let hub = EquipmentHub::new();
    let sink = Arc::new(SpySink::default());
    let mut exporter = Exporter::start(&hub, dispatcher(sink.clone(), valid_config()));
    sink.wait_for_calls(1).await;

    hub.publish_json(
        DeviceClass::Guider,
        json!({ "type": "info_updated", "snapshot": { "connected": true, "rms_total_arcsec": 0.8 } }),
    )
    .unwrap();
    hub.publish_image(json!({
        "path": "/data/lights/M31_0001.fits",
        "target_name": "M31",
        "star_analysis": { "hfr": 2.1 }
    }))
    .unwrap();
    sink.wait_for_calls(3).await;

    let measurements = sink.measurements();
    assert!(measurements.contains(&"guider_err_total_arcsec".to_string()));
    assert!(measurements.contains(&"image_hfr".to_string()));
    let image_point = sink
        .points()
        .into_iter()
        .find(|p| p.measurement() == "image_hfr")
        .unwrap();
    assert_eq!(image_point.tag_value("target_name"), Some("M31"));

    exporter.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn unconfigured_exporter_writes_nothing() {
    let hub = EquipmentHub::new();
    let sink = Arc::new(SpySink::default());
    let mut exporter = Exporter::start(&hub, dispatcher(sink.clone(), ExporterConfig::default()));

    hub.publish_json(
        DeviceClass::Focuser,
        json!({ "type": "connected", "name": "EAF" }),
    )
    .unwrap();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(sink.call_count(), 0);

    exporter.teardown().await;
}
