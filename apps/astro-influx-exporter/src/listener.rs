use crate::devices::DeviceClass;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::events::{connection_point, EventContext};
use crate::mediator::{Mediator, Subscription};
use crate::point::Point;
use crate::schema::{build_snapshot_points, Metric, Snapshot};
use crate::tags::Equipment;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// What a host publishes on a device mediator.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceMessage<S, E> {
    InfoUpdated {
        snapshot: S,
    },
    Connected {
        #[serde(default)]
        name: Option<String>,
    },
    Disconnected,
    Event {
        event: E,
    },
}

pub type DeviceMediator<C> =
    Mediator<DeviceMessage<<C as DeviceCategory>::Snapshot, <C as DeviceCategory>::Event>>;

/// One equipment category: its snapshot shape, its discrete events and the
/// metrics it reports. Everything else is shared by [`DeviceListener`].
pub trait DeviceCategory: Send + Sync + 'static {
    const CLASS: DeviceClass;

    type Snapshot: Snapshot + Clone + Default + DeserializeOwned + Send + Sync + 'static;
    type Event: DeserializeOwned + Clone + Send + Sync + 'static;
    /// Per-listener scratch state (throttles, open intervals).
    type State: Default + Send + 'static;

    const METRICS: &'static [Metric<Self::Snapshot>];

    fn snapshot_points(
        _state: &mut Self::State,
        snapshot: &Self::Snapshot,
        now: DateTime<Utc>,
    ) -> Vec<Point> {
        build_snapshot_points(snapshot, Self::METRICS, now)
    }

    fn event_points(
        _state: &mut Self::State,
        _event: &Self::Event,
        _ctx: &EventContext,
    ) -> anyhow::Result<Vec<Point>> {
        Ok(Vec::new())
    }

    /// Called once the write for a snapshot batch has finished.
    fn snapshot_dispatched(_state: &mut Self::State, _at: DateTime<Utc>, _outcome: DispatchOutcome) {}
}

struct ListenerState<C: DeviceCategory> {
    snapshot: C::Snapshot,
    device_name: String,
    category: C::State,
}

struct ListenerInner<C: DeviceCategory> {
    dispatcher: Dispatcher,
    state: Mutex<ListenerState<C>>,
}

impl<C: DeviceCategory> ListenerInner<C> {
    fn lock(&self) -> MutexGuard<'_, ListenerState<C>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Subscribes one category mediator to the write pipeline for as long as it lives.
pub struct DeviceListener<C: DeviceCategory> {
    inner: Arc<ListenerInner<C>>,
    subscription: Option<Subscription>,
}

impl<C: DeviceCategory> DeviceListener<C> {
    pub fn attach(mediator: &DeviceMediator<C>, dispatcher: Dispatcher) -> Self {
        let inner = Arc::new(ListenerInner {
            dispatcher,
            state: Mutex::new(ListenerState::<C> {
                snapshot: C::Snapshot::default(),
                device_name: String::new(),
                category: C::State::default(),
            }),
        });
        let handler_inner = inner.clone();
        let subscription = mediator.subscribe(move |message| handle(&handler_inner, message));
        tracing::debug!(category = %C::CLASS, "device listener subscribed");

        Self {
            inner,
            subscription: Some(subscription),
        }
    }

    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::debug!(category = %C::CLASS, "device listener unsubscribed");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn latest_snapshot(&self) -> C::Snapshot {
        self.inner.lock().snapshot.clone()
    }
}

fn handle<C: DeviceCategory>(
    inner: &Arc<ListenerInner<C>>,
    message: &DeviceMessage<C::Snapshot, C::Event>,
) {
    let now = Utc::now();
    let ctx = EventContext::new(inner.dispatcher.config().event_measurement.as_str(), now);

    let mut guard = inner.lock();
    let state = &mut *guard;
    let (built, from_snapshot) = match message {
        DeviceMessage::InfoUpdated { snapshot } => {
            state.snapshot = snapshot.clone();
            if !snapshot.device_name().trim().is_empty() {
                state.device_name = snapshot.device_name().to_string();
            }
            (
                Ok(C::snapshot_points(&mut state.category, snapshot, now)),
                true,
            )
        }
        DeviceMessage::Connected { name } => {
            if let Some(name) = name.as_deref().filter(|n| !n.trim().is_empty()) {
                state.device_name = name.to_string();
            }
            (Ok(vec![connection_point(&ctx, C::CLASS, true)]), false)
        }
        DeviceMessage::Disconnected => (Ok(vec![connection_point(&ctx, C::CLASS, false)]), false),
        DeviceMessage::Event { event } => (C::event_points(&mut state.category, event, &ctx), false),
    };
    let equipment = Equipment::new(C::CLASS, state.device_name.clone());
    drop(guard);

    let points = match built {
        Ok(points) => points,
        Err(err) => {
            tracing::warn!(
                category = %C::CLASS,
                error = %format!("{err:#}"),
                "failed to build points; dropping batch"
            );
            return;
        }
    };
    if points.is_empty() {
        return;
    }

    let task_inner = inner.clone();
    inner.dispatcher.runtime().spawn(async move {
        let outcome = task_inner.dispatcher.dispatch(points, Some(&equipment)).await;
        if from_snapshot {
            C::snapshot_dispatched(&mut task_inner.lock().category, now, outcome);
        }
    });
}
