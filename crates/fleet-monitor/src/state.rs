use crate::sync::{ActionOutcome, ActionRequest, SyncEvent};
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fleet_client::ClientError;
use fleet_core::projection::OrderFilter;
use fleet_core::{Bot, GridTopology, Node, Order, Restaurant, SimulationStatus};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_LOG_CAPACITY: usize = 200;
pub const DEFAULT_TOAST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Topology not yet delivered; nothing is polled.
    Loading,
    Ready,
    TornDown,
}

/// Newest poll cycle applied to one slice of state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceClock {
    applied: Option<u64>,
}

impl SliceClock {
    /// Accepts `cycle` unless a newer cycle has already been applied.
    pub fn admit(&mut self, cycle: u64) -> bool {
        if self.applied.is_some_and(|applied| cycle < applied) {
            return false;
        }
        self.applied = Some(cycle);
        true
    }

    pub fn applied(&self) -> Option<u64> {
        self.applied
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SliceClocks {
    bots: SliceClock,
    orders: SliceClock,
    status: SliceClock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    pub fn render(&self) -> String {
        format!("{} — {}", self.at.format("%H:%M:%S"), self.message)
    }
}

/// Bounded record of local user actions, oldest dropped first.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            at: Local::now(),
            message: message.into(),
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().rev()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub expires_at: Instant,
}

/// What the event loop must do in response to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Dispatch(ActionRequest),
    AutoAdvance(bool),
}

pub struct ViewState {
    pub phase: Phase,
    pub topology: Option<GridTopology>,
    pub bots: Vec<Bot>,
    pub orders: Vec<Order>,
    pub status: Option<SimulationStatus>,
    pub log: ActivityLog,
    pub toast: Option<Toast>,
    pub filter: OrderFilter,
    pub selected_restaurant: usize,
    pub selected_delivery: usize,
    pub auto_advance: bool,
    pub show_help: bool,
    pub show_guide: bool,
    pub status_note: Option<String>,
    /// Consecutive failed poll results since the last successful one.
    pub poll_failures: u32,
    clocks: SliceClocks,
    toast_ttl: Duration,
}

impl ViewState {
    pub fn new(log_capacity: usize, toast_ttl: Duration) -> Self {
        Self {
            phase: Phase::Loading,
            topology: None,
            bots: Vec::new(),
            orders: Vec::new(),
            status: None,
            log: ActivityLog::new(log_capacity),
            toast: None,
            filter: OrderFilter::default(),
            selected_restaurant: 0,
            selected_delivery: 0,
            auto_advance: false,
            show_help: false,
            show_guide: true,
            status_note: Some("connecting to simulation".to_string()),
            poll_failures: 0,
            clocks: SliceClocks::default(),
            toast_ttl,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    /// After this every [`ViewState::apply`] is ignored.
    pub fn tear_down(&mut self) {
        self.phase = Phase::TornDown;
    }

    pub fn apply(&mut self, event: SyncEvent, now: Instant) {
        if self.phase == Phase::TornDown {
            return;
        }
        match event {
            SyncEvent::Topology(topology) => self.set_topology(topology),
            SyncEvent::BootstrapFailed { attempt, error } => {
                self.status_note = Some(format!(
                    "waiting for simulation: {} (attempt {attempt})",
                    error.user_message()
                ));
            }
            SyncEvent::Bots { cycle, result } => match result {
                Ok(bots) => {
                    if admit(&mut self.clocks.bots, "bots", cycle) {
                        self.bots = bots;
                    }
                    self.poll_failures = 0;
                }
                Err(_) => self.poll_failures = self.poll_failures.saturating_add(1),
            },
            SyncEvent::Orders { cycle, result } => match result {
                Ok(orders) => {
                    if admit(&mut self.clocks.orders, "orders", cycle) {
                        self.orders = orders;
                    }
                    self.poll_failures = 0;
                }
                Err(_) => self.poll_failures = self.poll_failures.saturating_add(1),
            },
            SyncEvent::Status { cycle, result } => match result {
                Ok(status) => {
                    if admit(&mut self.clocks.status, "status", cycle) {
                        self.status = Some(status);
                    }
                    self.poll_failures = 0;
                }
                Err(_) => self.poll_failures = self.poll_failures.saturating_add(1),
            },
            SyncEvent::Action { request, result } => self.apply_action(request, result, now),
        }
    }

    fn set_topology(&mut self, topology: GridTopology) {
        for issue in topology.validate() {
            warn!(event = "topology_issue", issue = %issue);
        }
        self.topology = Some(topology);
        self.phase = Phase::Ready;
        self.status_note = None;
        self.selected_restaurant = 0;
        self.selected_delivery = 0;
    }

    fn apply_action(
        &mut self,
        request: ActionRequest,
        result: Result<ActionOutcome, ClientError>,
        now: Instant,
    ) {
        match &result {
            Ok(ActionOutcome::OrderCreated(order)) => {
                debug!(event = "order_created", order_id = order.id, status = %order.status);
            }
            Ok(ActionOutcome::Acknowledged(ack)) => {
                debug!(
                    event = "control_acknowledged",
                    action = request.label(),
                    message = ack.message.as_deref().unwrap_or_default(),
                    tick = ?ack.tick
                );
            }
            Err(_) => {}
        }
        match (request, result) {
            (
                ActionRequest::CreateOrder {
                    restaurant_name,
                    delivery_point_id,
                    ..
                },
                Ok(_),
            ) => {
                self.log.push(format!(
                    "Order created — {restaurant_name} → delivery node {delivery_point_id}"
                ));
            }
            (ActionRequest::CreateOrder { .. }, Err(err)) => {
                let message = err.user_message();
                self.log.push(format!("Order failed — {message}"));
                self.show_toast(ToastKind::Error, message, now);
            }
            (ActionRequest::Start, Ok(_)) => self.log.push("Simulation started"),
            (ActionRequest::Stop, Ok(_)) => self.log.push("Simulation stopped"),
            (ActionRequest::Tick, Ok(_)) => self.log.push("Tick requested"),
            (ActionRequest::Reset, Ok(_)) => {
                self.log.clear();
                self.log.push("Simulation reset");
            }
            (request, Err(err)) => {
                let message = err.user_message();
                self.log.push(format!("{} failed — {message}", request.label()));
                self.show_toast(ToastKind::Error, message, now);
            }
        }
    }

    pub fn show_toast(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) {
        self.toast = Some(Toast {
            message: message.into(),
            kind,
            expires_at: now + self.toast_ttl,
        });
    }

    pub fn prune_toast(&mut self, now: Instant) {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
        }
    }

    pub fn restaurants(&self) -> &[Restaurant] {
        self.topology
            .as_ref()
            .map(|topology| topology.restaurants.as_slice())
            .unwrap_or(&[])
    }

    /// Delivery targets offered for new orders: the explicit list when the
    /// topology carries one, otherwise every node flagged as a delivery point.
    pub fn delivery_points(&self) -> Vec<&Node> {
        let Some(topology) = &self.topology else {
            return Vec::new();
        };
        if !topology.delivery_points.is_empty() {
            return topology.delivery_points.iter().collect();
        }
        topology
            .nodes
            .iter()
            .filter(|node| node.is_delivery_point)
            .collect()
    }

    pub fn selected_restaurant(&self) -> Option<&Restaurant> {
        self.restaurants().get(self.selected_restaurant)
    }

    pub fn selected_delivery_point(&self) -> Option<&Node> {
        self.delivery_points().get(self.selected_delivery).copied()
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Option<Command> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Command::Quit);
        }
        if key.code == KeyCode::Char('?') {
            self.show_help = !self.show_help;
            return None;
        }
        if key.code == KeyCode::Esc {
            if self.show_help {
                self.show_help = false;
            } else {
                self.toast = None;
            }
            return None;
        }
        if self.show_help {
            return None;
        }

        match key.code {
            KeyCode::Char('q') => Some(Command::Quit),
            KeyCode::Char('s') => Some(Command::Dispatch(ActionRequest::Start)),
            KeyCode::Char('x') => {
                self.auto_advance = false;
                Some(Command::Dispatch(ActionRequest::Stop))
            }
            KeyCode::Char('t') => Some(Command::Dispatch(ActionRequest::Tick)),
            KeyCode::Char('R') => {
                self.auto_advance = false;
                Some(Command::Dispatch(ActionRequest::Reset))
            }
            KeyCode::Char('a') => {
                self.auto_advance = !self.auto_advance;
                Some(Command::AutoAdvance(self.auto_advance))
            }
            KeyCode::Char('n') | KeyCode::Enter => self.order_request(now).map(Command::Dispatch),
            KeyCode::Char('[') => {
                self.selected_restaurant =
                    step(self.selected_restaurant, self.restaurants().len(), -1);
                None
            }
            KeyCode::Char(']') => {
                self.selected_restaurant =
                    step(self.selected_restaurant, self.restaurants().len(), 1);
                None
            }
            KeyCode::Char(',') => {
                self.selected_delivery =
                    step(self.selected_delivery, self.delivery_points().len(), -1);
                None
            }
            KeyCode::Char('.') => {
                self.selected_delivery =
                    step(self.selected_delivery, self.delivery_points().len(), 1);
                None
            }
            KeyCode::Char('f') => {
                self.filter = self.filter.next();
                None
            }
            KeyCode::Char('g') => {
                self.show_guide = !self.show_guide;
                None
            }
            _ => None,
        }
    }

    fn order_request(&mut self, now: Instant) -> Option<ActionRequest> {
        if !self.is_ready() {
            self.show_toast(ToastKind::Info, "Grid is still loading", now);
            return None;
        }
        let restaurant = self
            .selected_restaurant()
            .map(|restaurant| (restaurant.id, restaurant.name.clone()));
        let delivery_point = self.selected_delivery_point().map(|node| node.id);
        match (restaurant, delivery_point) {
            (None, _) => {
                self.show_toast(ToastKind::Info, "No restaurant available", now);
                None
            }
            (_, None) => {
                self.show_toast(ToastKind::Info, "No delivery point available", now);
                None
            }
            (Some((restaurant_id, restaurant_name)), Some(delivery_point_id)) => {
                Some(ActionRequest::CreateOrder {
                    restaurant_id,
                    restaurant_name,
                    delivery_point_id,
                })
            }
        }
    }
}

fn admit(clock: &mut SliceClock, slice: &'static str, cycle: u64) -> bool {
    let admitted = clock.admit(cycle);
    if !admitted {
        debug!(
            event = "stale_result_discarded",
            slice,
            cycle,
            applied = clock.applied().unwrap_or_default()
        );
    }
    admitted
}

fn step(current: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    let len = len as isize;
    ((current as isize + delta).rem_euclid(len)) as usize
}
