use crate::model::{Bot, Order, OrderStatus, SimulationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderFilter {
    #[default]
    All,
    Active,
    Delivered,
}

impl OrderFilter {
    pub fn label(self) -> &'static str {
        match self {
            OrderFilter::All => "ALL",
            OrderFilter::Active => "ACTIVE",
            OrderFilter::Delivered => "DELIVERED",
        }
    }

    pub fn next(self) -> Self {
        match self {
            OrderFilter::All => OrderFilter::Active,
            OrderFilter::Active => OrderFilter::Delivered,
            OrderFilter::Delivered => OrderFilter::All,
        }
    }

    /// Cancelled orders only ever match [`OrderFilter::All`].
    pub fn matches(self, order: &Order) -> bool {
        match self {
            OrderFilter::All => true,
            OrderFilter::Active => order.status.is_active(),
            OrderFilter::Delivered => order.status == OrderStatus::Delivered,
        }
    }
}

pub fn filter_orders(orders: &[Order], filter: OrderFilter) -> Vec<&Order> {
    orders.iter().filter(|order| filter.matches(order)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterCounts {
    pub all: usize,
    pub active: usize,
    pub delivered: usize,
    pub cancelled: usize,
}

impl FilterCounts {
    pub fn of(orders: &[Order]) -> Self {
        let mut counts = FilterCounts {
            all: orders.len(),
            ..FilterCounts::default()
        };
        for order in orders {
            match order.status {
                OrderStatus::Delivered => counts.delivered += 1,
                OrderStatus::Cancelled => counts.cancelled += 1,
                _ => counts.active += 1,
            }
        }
        counts
    }

    pub fn for_filter(&self, filter: OrderFilter) -> usize {
        match filter {
            OrderFilter::All => self.all,
            OrderFilter::Active => self.active,
            OrderFilter::Delivered => self.delivered,
        }
    }
}

pub fn active_bot_count(bots: &[Bot]) -> usize {
    bots.iter().filter(|bot| bot.is_active()).count()
}

/// The four headline counters, taken from the status snapshot rather than
/// recounted from the order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounters {
    pub total: i64,
    pub pending: i64,
    pub active: i64,
    pub delivered: i64,
}

impl StatusCounters {
    pub fn from_status(status: &SimulationStatus) -> Self {
        let active = status
            .total_orders
            .saturating_sub(status.pending_orders)
            .saturating_sub(status.delivered_orders)
            .max(0);
        Self {
            total: status.total_orders.max(0),
            pending: status.pending_orders.max(0),
            active,
            delivered: status.delivered_orders.max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BotStatus;

    fn order(id: i64, status: OrderStatus) -> Order {
        Order {
            id,
            restaurant_id: 1,
            restaurant_name: Some("PIZZA".to_string()),
            pickup_node_id: 5,
            pickup_address: "LR11".to_string(),
            delivery_node_id: 12,
            delivery_address: "LR30".to_string(),
            bot_id: status.expects_bot().then_some(1),
            bot_name: status.expects_bot().then(|| "Bot-1".to_string()),
            status,
            created_at: None,
            assigned_at: None,
            picked_up_at: None,
            delivered_at: None,
        }
    }

    fn mixed_orders() -> Vec<Order> {
        vec![
            order(1, OrderStatus::Pending),
            order(2, OrderStatus::Assigned),
            order(3, OrderStatus::PickedUp),
            order(4, OrderStatus::Delivered),
            order(5, OrderStatus::Cancelled),
            order(6, OrderStatus::Delivered),
            order(7, OrderStatus::Cancelled),
        ]
    }

    #[test]
    fn filter_partitions_orders() {
        let orders = mixed_orders();
        let all = filter_orders(&orders, OrderFilter::All);
        let active = filter_orders(&orders, OrderFilter::Active);
        let delivered = filter_orders(&orders, OrderFilter::Delivered);
        let cancelled = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Cancelled)
            .count();

        assert_eq!(all.len(), orders.len());
        assert_eq!(active.len() + delivered.len() + cancelled, all.len());
        assert!(active
            .iter()
            .all(|a| delivered.iter().all(|d| a.id != d.id)));
        assert_eq!(
            active.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn counts_agree_with_filters() {
        let orders = mixed_orders();
        let counts = FilterCounts::of(&orders);
        for filter in [OrderFilter::All, OrderFilter::Active, OrderFilter::Delivered] {
            assert_eq!(
                counts.for_filter(filter),
                filter_orders(&orders, filter).len()
            );
        }
        assert_eq!(counts.cancelled, 2);
        assert_eq!(FilterCounts::of(&[]), FilterCounts::default());
    }

    #[test]
    fn filter_cycles_back_to_all() {
        let filter = OrderFilter::default();
        assert_eq!(filter.next().next().next(), OrderFilter::All);
        assert_eq!(filter.next().label(), "ACTIVE");
    }

    #[test]
    fn active_bots_exclude_idle() {
        let statuses = [
            BotStatus::Idle,
            BotStatus::Moving,
            BotStatus::PickingUp,
            BotStatus::Delivering,
            BotStatus::Idle,
        ];
        let bots: Vec<Bot> = statuses
            .iter()
            .enumerate()
            .map(|(idx, status)| Bot {
                id: idx as i64 + 1,
                name: format!("Bot-{}", idx + 1),
                status: *status,
                current_node_id: Some(1),
                x: Some(0),
                y: Some(0),
                route: Vec::new(),
                target: None,
                active_orders: 0,
            })
            .collect();
        assert_eq!(active_bot_count(&bots), 3);
        assert_eq!(active_bot_count(&[]), 0);
    }

    #[test]
    fn counters_derive_active_and_clamp() {
        let status = SimulationStatus {
            is_running: true,
            tick_count: 12,
            total_orders: 10,
            pending_orders: 3,
            delivered_orders: 4,
            active_bots: 2,
        };
        let counters = StatusCounters::from_status(&status);
        assert_eq!(counters.active, 3);
        assert_eq!(counters.total, 10);

        let skewed = SimulationStatus {
            total_orders: 2,
            pending_orders: 5,
            delivered_orders: -1,
            ..status
        };
        let counters = StatusCounters::from_status(&skewed);
        assert_eq!(counters.active, 0);
        assert_eq!(counters.delivered, 0);

        let extreme = SimulationStatus {
            total_orders: i64::MIN,
            pending_orders: i64::MAX,
            ..SimulationStatus::default()
        };
        assert_eq!(StatusCounters::from_status(&extreme).active, 0);
    }
}
