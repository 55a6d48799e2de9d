use crate::devices::{
    Camera, DeviceClass, Dome, FilterWheel, FlatDevice, Focuser, Guider, Mount, Rotator,
    SafetyMonitor, Switch, Weather,
};
use crate::image::ImageSavedEvent;
use crate::listener::{DeviceCategory, DeviceMediator, DeviceMessage};
use crate::mediator::Mediator;
use serde_json::Value;

/// Every mediator the exporter listens on. Cloning shares the same registries.
#[derive(Clone, Default)]
pub struct EquipmentHub {
    pub camera: DeviceMediator<Camera>,
    pub dome: DeviceMediator<Dome>,
    pub filter_wheel: DeviceMediator<FilterWheel>,
    pub flat_device: DeviceMediator<FlatDevice>,
    pub focuser: DeviceMediator<Focuser>,
    pub guider: DeviceMediator<Guider>,
    pub mount: DeviceMediator<Mount>,
    pub rotator: DeviceMediator<Rotator>,
    pub safety_monitor: DeviceMediator<SafetyMonitor>,
    pub switch: DeviceMediator<Switch>,
    pub weather: DeviceMediator<Weather>,
    pub images: Mediator<ImageSavedEvent>,
}

fn publish_as<C: DeviceCategory>(
    mediator: &DeviceMediator<C>,
    body: Value,
) -> Result<usize, serde_json::Error> {
    let message: DeviceMessage<C::Snapshot, C::Event> = serde_json::from_value(body)?;
    Ok(mediator.publish(&message))
}

impl EquipmentHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a host message for `class` and publishes it. Returns the
    /// number of handlers that saw it.
    pub fn publish_json(&self, class: DeviceClass, body: Value) -> Result<usize, serde_json::Error> {
        match class {
            DeviceClass::Camera => publish_as::<Camera>(&self.camera, body),
            DeviceClass::Dome => publish_as::<Dome>(&self.dome, body),
            DeviceClass::FilterWheel => publish_as::<FilterWheel>(&self.filter_wheel, body),
            DeviceClass::FlatDevice => publish_as::<FlatDevice>(&self.flat_device, body),
            DeviceClass::Focuser => publish_as::<Focuser>(&self.focuser, body),
            DeviceClass::Guider => publish_as::<Guider>(&self.guider, body),
            DeviceClass::Mount => publish_as::<Mount>(&self.mount, body),
            DeviceClass::Rotator => publish_as::<Rotator>(&self.rotator, body),
            DeviceClass::SafetyMonitor => publish_as::<SafetyMonitor>(&self.safety_monitor, body),
            DeviceClass::Switch => publish_as::<Switch>(&self.switch, body),
            DeviceClass::Weather => publish_as::<Weather>(&self.weather, body),
        }
    }

    pub fn publish_image(&self, body: Value) -> Result<usize, serde_json::Error> {
        let event: ImageSavedEvent = serde_json::from_value(body)?;
        Ok(self.images.publish(&event))
    }

    pub fn subscriber_count(&self) -> usize {
        self.camera.subscriber_count()
            + self.dome.subscriber_count()
            + self.filter_wheel.subscriber_count()
            + self.flat_device.subscriber_count()
            + self.focuser.subscriber_count()
            + self.guider.subscriber_count()
            + self.mount.subscriber_count()
            + self.rotator.subscriber_count()
            + self.safety_monitor.subscriber_count()
            + self.switch.subscriber_count()
            + self.weather.subscriber_count()
            + self.images.subscriber_count()
    }
}
