use crate::devices::{
    Camera, Dome, FilterWheel, FlatDevice, Focuser, Guider, Mount, Rotator, SafetyMonitor, Switch,
    Weather,
};
use crate::dispatch::Dispatcher;
use crate::hub::EquipmentHub;
use crate::image::ImageListener;
use crate::listener::DeviceListener;
use crate::sampler::{AstroSampler, SamplerHandle, SamplerState};
use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod tests;

/// Owns every subscription and the sampler task for one plugin lifetime.
pub struct Exporter {
    camera: DeviceListener<Camera>,
    dome: DeviceListener<Dome>,
    filter_wheel: DeviceListener<FilterWheel>,
    flat_device: DeviceListener<FlatDevice>,
    focuser: DeviceListener<Focuser>,
    guider: DeviceListener<Guider>,
    mount: DeviceListener<Mount>,
    rotator: DeviceListener<Rotator>,
    safety_monitor: DeviceListener<SafetyMonitor>,
    switch: DeviceListener<Switch>,
    weather: DeviceListener<Weather>,
    images: ImageListener,
    sampler: Option<SamplerHandle>,
    cancel: CancellationToken,
}

impl Exporter {
    /// Subscribes to every mediator on `hub` and starts the sampler.
    pub fn start(hub: &EquipmentHub, dispatcher: Dispatcher) -> Self {
        let cancel = CancellationToken::new();
        let interval = dispatcher.config().sampler_interval();
        let sampler = AstroSampler::new(dispatcher.clone(), interval).start(cancel.child_token());

        let exporter = Self {
            camera: DeviceListener::attach(&hub.camera, dispatcher.clone()),
            dome: DeviceListener::attach(&hub.dome, dispatcher.clone()),
            filter_wheel: DeviceListener::attach(&hub.filter_wheel, dispatcher.clone()),
            flat_device: DeviceListener::attach(&hub.flat_device, dispatcher.clone()),
            focuser: DeviceListener::attach(&hub.focuser, dispatcher.clone()),
            guider: DeviceListener::attach(&hub.guider, dispatcher.clone()),
            mount: DeviceListener::attach(&hub.mount, dispatcher.clone()),
            rotator: DeviceListener::attach(&hub.rotator, dispatcher.clone()),
            safety_monitor: DeviceListener::attach(&hub.safety_monitor, dispatcher.clone()),
            switch: DeviceListener::attach(&hub.switch, dispatcher.clone()),
            weather: DeviceListener::attach(&hub.weather, dispatcher.clone()),
            images: ImageListener::attach(&hub.images, dispatcher),
            sampler: Some(sampler),
            cancel,
        };
        tracing::info!(
            sampler_interval_secs = interval.as_secs(),
            "exporter started"
        );
        exporter
    }

    pub fn sampler_state(&self) -> SamplerState {
        self.sampler
            .as_ref()
            .map_or(SamplerState::Cancelled, SamplerHandle::state)
    }

    pub fn is_subscribed(&self) -> bool {
        self.camera.is_subscribed()
            && self.dome.is_subscribed()
            && self.filter_wheel.is_subscribed()
            && self.flat_device.is_subscribed()
            && self.focuser.is_subscribed()
            && self.guider.is_subscribed()
            && self.mount.is_subscribed()
            && self.rotator.is_subscribed()
            && self.safety_monitor.is_subscribed()
            && self.switch.is_subscribed()
            && self.weather.is_subscribed()
            && self.images.is_subscribed()
    }

    /// Unsubscribes everything and stops the sampler. Writes already in
    /// flight are left to finish on their own. Safe to call twice.
    pub async fn teardown(&mut self) {
        self.camera.detach();
        self.dome.detach();
        self.filter_wheel.detach();
        self.flat_device.detach();
        self.focuser.detach();
        self.guider.detach();
        self.mount.detach();
        self.rotator.detach();
        self.safety_monitor.detach();
        self.switch.detach();
        self.weather.detach();
        self.images.detach();

        self.cancel.cancel();
        if let Some(sampler) = self.sampler.take() {
            let state = sampler.stop().await;
            tracing::info!(?state, "exporter stopped");
        }
    }
}
