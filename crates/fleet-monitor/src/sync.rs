use fleet_client::{ClientError, ControlAck, SimulationSource};
use fleet_core::{Bot, GridTopology, NodeId, Order, RestaurantId, SimulationStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const EVENT_CHANNEL_CAPACITY: usize = 256;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    pub auto_tick_interval: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            auto_tick_interval: Duration::from_secs(1),
        }
    }
}

/// A user-initiated call against the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    CreateOrder {
        restaurant_id: RestaurantId,
        restaurant_name: String,
        delivery_point_id: NodeId,
    },
    Start,
    Stop,
    Tick,
    Reset,
}

impl ActionRequest {
    pub fn label(&self) -> &'static str {
        match self {
            ActionRequest::CreateOrder { .. } => "Order",
            ActionRequest::Start => "Start",
            ActionRequest::Stop => "Stop",
            ActionRequest::Tick => "Tick",
            ActionRequest::Reset => "Reset",
        }
    }

    /// Stop and reset end any auto-advance the moment they are issued.
    pub fn halts_auto_advance(&self) -> bool {
        matches!(self, ActionRequest::Stop | ActionRequest::Reset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    OrderCreated(Order),
    Acknowledged(ControlAck),
}

#[derive(Debug, Clone)]
pub enum SyncEvent {
    Topology(GridTopology),
    BootstrapFailed {
        attempt: u32,
        error: ClientError,
    },
    Bots {
        cycle: u64,
        result: Result<Vec<Bot>, ClientError>,
    },
    Orders {
        cycle: u64,
        result: Result<Vec<Order>, ClientError>,
    },
    Status {
        cycle: u64,
        result: Result<SimulationStatus, ClientError>,
    },
    Action {
        request: ActionRequest,
        result: Result<ActionOutcome, ClientError>,
    },
}

/// Owns every background task that talks to the source. Results flow back
/// to the UI loop over the event channel; nothing here touches view state.
pub struct SyncDriver<S: SimulationSource> {
    source: Arc<S>,
    tx: Option<mpsc::Sender<SyncEvent>>,
    settings: SyncSettings,
    polling: Option<JoinHandle<()>>,
    auto_tick: Option<JoinHandle<()>>,
    actions: Vec<JoinHandle<()>>,
}

impl<S: SimulationSource> SyncDriver<S> {
    /// Starts bootstrapping immediately. Polling begins once the topology
    /// has been delivered.
    pub fn spawn(source: S, settings: SyncSettings) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let source = Arc::new(source);
        let polling = tokio::spawn(run_sync(
            source.clone(),
            tx.clone(),
            settings.poll_interval,
        ));
        let driver = Self {
            source,
            tx: Some(tx),
            settings,
            polling: Some(polling),
            auto_tick: None,
            actions: Vec::new(),
        };
        (driver, rx)
    }

    pub fn auto_advance_enabled(&self) -> bool {
        self.auto_tick
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        if enabled {
            if self.auto_advance_enabled() || self.tx.is_none() {
                return;
            }
            let source = self.source.clone();
            let period = self.settings.auto_tick_interval;
            self.auto_tick = Some(tokio::spawn(auto_advance(source, period)));
            info!(event = "auto_advance", enabled = true, period_ms = period.as_millis() as u64);
        } else if let Some(handle) = self.auto_tick.take() {
            handle.abort();
            info!(event = "auto_advance", enabled = false);
        }
    }

    pub fn dispatch(&mut self, request: ActionRequest) {
        if request.halts_auto_advance() {
            self.set_auto_advance(false);
        }
        let Some(tx) = self.tx.clone() else {
            return;
        };
        self.actions.retain(|handle| !handle.is_finished());
        let source = self.source.clone();
        self.actions.push(tokio::spawn(async move {
            let result = perform(source.as_ref(), &request).await;
            match &result {
                Ok(_) => info!(event = "action_completed", action = request.label()),
                Err(err) => warn!(event = "action_failed", action = request.label(), error = %err),
            }
            let _ = tx.send(SyncEvent::Action { request, result }).await;
        }));
    }

    /// Cancels bootstrap, polling (with in-flight fetches), auto-advance and
    /// pending actions, then closes the event channel.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.polling.take() {
            handle.abort();
        }
        if let Some(handle) = self.auto_tick.take() {
            handle.abort();
        }
        for handle in self.actions.drain(..) {
            handle.abort();
        }
        self.tx = None;
    }
}

impl<S: SimulationSource> Drop for SyncDriver<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn perform<S: SimulationSource>(
    source: &S,
    request: &ActionRequest,
) -> Result<ActionOutcome, ClientError> {
    match request {
        ActionRequest::CreateOrder {
            restaurant_id,
            delivery_point_id,
            ..
        } => source
            .create_order(*restaurant_id, *delivery_point_id)
            .await
            .map(ActionOutcome::OrderCreated),
        ActionRequest::Start => source.start().await.map(ActionOutcome::Acknowledged),
        ActionRequest::Stop => source.stop().await.map(ActionOutcome::Acknowledged),
        ActionRequest::Tick => source.tick().await.map(ActionOutcome::Acknowledged),
        ActionRequest::Reset => source.reset().await.map(ActionOutcome::Acknowledged),
    }
}

async fn run_sync<S: SimulationSource>(
    source: Arc<S>,
    tx: mpsc::Sender<SyncEvent>,
    poll_interval: Duration,
) {
    let Some(topology) = bootstrap(source.as_ref(), &tx).await else {
        return;
    };
    info!(
        event = "topology_loaded",
        nodes = topology.nodes.len(),
        restaurants = topology.restaurants.len()
    );
    if tx.send(SyncEvent::Topology(topology)).await.is_err() {
        return;
    }

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();
    let mut cycle = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if tx.is_closed() {
                    break;
                }
                cycle += 1;
                spawn_cycle(&mut in_flight, &source, &tx, cycle);
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(err) = joined {
                    if err.is_panic() {
                        warn!(event = "poll_task_panicked", error = %err);
                    }
                }
            }
        }
    }
}

async fn bootstrap<S: SimulationSource>(
    source: &S,
    tx: &mpsc::Sender<SyncEvent>,
) -> Option<GridTopology> {
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match source.fetch_topology().await {
            Ok(topology) => return Some(topology),
            Err(error) => {
                warn!(
                    event = "bootstrap_failed",
                    attempt,
                    retry_in_ms = backoff.as_millis() as u64,
                    error = %error
                );
                if tx
                    .send(SyncEvent::BootstrapFailed { attempt, error })
                    .await
                    .is_err()
                {
                    return None;
                }
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff);
            }
        }
    }
}

/// One cycle is three independent fetches; each result is reported as soon
/// as it lands so a slow slice never holds back the others.
fn spawn_cycle<S: SimulationSource>(
    in_flight: &mut JoinSet<()>,
    source: &Arc<S>,
    tx: &mpsc::Sender<SyncEvent>,
    cycle: u64,
) {
    debug!(event = "poll_cycle", cycle, in_flight = in_flight.len());

    let (src, out) = (source.clone(), tx.clone());
    in_flight.spawn(async move {
        let result = src.fetch_bots().await;
        log_poll_failure("bots", cycle, &result);
        let _ = out.send(SyncEvent::Bots { cycle, result }).await;
    });

    let (src, out) = (source.clone(), tx.clone());
    in_flight.spawn(async move {
        let result = src.fetch_orders().await;
        log_poll_failure("orders", cycle, &result);
        let _ = out.send(SyncEvent::Orders { cycle, result }).await;
    });

    let (src, out) = (source.clone(), tx.clone());
    in_flight.spawn(async move {
        let result = src.fetch_status().await;
        log_poll_failure("status", cycle, &result);
        let _ = out.send(SyncEvent::Status { cycle, result }).await;
    });
}

fn log_poll_failure<T>(slice: &'static str, cycle: u64, result: &Result<T, ClientError>) {
    if let Err(err) = result {
        warn!(event = "poll_failed", slice, cycle, error = %err);
    }
}

async fn auto_advance<S: SimulationSource>(source: Arc<S>, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let source = source.clone();
                in_flight.spawn(async move {
                    if let Err(err) = source.tick().await {
                        warn!(event = "auto_tick_failed", error = %err);
                    }
                });
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }
}

fn next_backoff(current: Duration) -> Duration {
    let next = current + current;
    if next > MAX_BACKOFF {
        MAX_BACKOFF
    } else {
        next
    }
}
