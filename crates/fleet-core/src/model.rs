use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type NodeId = i64;
pub type RestaurantId = i64;
pub type BotId = i64;
pub type OrderId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub is_delivery_point: bool,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub node_id: NodeId,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedEdge {
    pub id: i64,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
}

/// Static map returned once per session by the simulation source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTopology {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub restaurants: Vec<Restaurant>,
    #[serde(default)]
    pub blocked_edges: Vec<BlockedEdge>,
    #[serde(default)]
    pub delivery_points: Vec<Node>,
}

/// Inclusive coordinate bounds of every node in a topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl GridBounds {
    pub fn columns(&self) -> u32 {
        self.max_x.abs_diff(self.min_x) + 1
    }

    pub fn rows(&self) -> u32 {
        self.max_y.abs_diff(self.min_y) + 1
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyIssue {
    #[error("nodes {first} and {second} share coordinate ({x},{y})")]
    DuplicateCoordinate {
        x: i32,
        y: i32,
        first: NodeId,
        second: NodeId,
    },
    #[error("restaurant {restaurant_id} references missing node {node_id}")]
    DanglingRestaurant {
        restaurant_id: RestaurantId,
        node_id: NodeId,
    },
    #[error("delivery point {node_id} is not a topology node")]
    DanglingDeliveryPoint { node_id: NodeId },
}

impl GridTopology {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn restaurant(&self, id: RestaurantId) -> Option<&Restaurant> {
        self.restaurants.iter().find(|restaurant| restaurant.id == id)
    }

    pub fn is_delivery_point(&self, node_id: NodeId) -> bool {
        self.delivery_points.iter().any(|node| node.id == node_id)
    }

    pub fn bounds(&self) -> Option<GridBounds> {
        let first = self.nodes.first()?;
        let mut bounds = GridBounds {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        for node in &self.nodes[1..] {
            bounds.min_x = bounds.min_x.min(node.x);
            bounds.max_x = bounds.max_x.max(node.x);
            bounds.min_y = bounds.min_y.min(node.y);
            bounds.max_y = bounds.max_y.max(node.y);
        }
        Some(bounds)
    }

    /// Reports contract violations without rejecting the topology; the view
    /// renders whatever it can resolve.
    pub fn validate(&self) -> Vec<TopologyIssue> {
        let mut issues = Vec::new();
        let mut by_xy: HashMap<(i32, i32), NodeId> = HashMap::new();
        for node in &self.nodes {
            if let Some(first) = by_xy.insert((node.x, node.y), node.id) {
                issues.push(TopologyIssue::DuplicateCoordinate {
                    x: node.x,
                    y: node.y,
                    first,
                    second: node.id,
                });
            }
        }
        for restaurant in &self.restaurants {
            if self.node(restaurant.node_id).is_none() {
                issues.push(TopologyIssue::DanglingRestaurant {
                    restaurant_id: restaurant.id,
                    node_id: restaurant.node_id,
                });
            }
        }
        for point in &self.delivery_points {
            if self.node(point.id).is_none() {
                issues.push(TopologyIssue::DanglingDeliveryPoint { node_id: point.id });
            }
        }
        issues
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotStatus {
    Idle,
    Moving,
    PickingUp,
    Delivering,
}

impl BotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotStatus::Idle => "IDLE",
            BotStatus::Moving => "MOVING",
            BotStatus::PickingUp => "PICKING_UP",
            BotStatus::Delivering => "DELIVERING",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, BotStatus::Idle)
    }
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a bot intends to do at its target node.
///
/// The source has reported both `pickup`/`deliver` and `PICKUP`/`DELIVER`
/// (plus `STATION` for the return leg), so decoding ignores case and
/// encoding always uses the lowercase form.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TargetAction {
    Pickup,
    Deliver,
    Station,
}

impl TargetAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetAction::Pickup => "pickup",
            TargetAction::Deliver => "deliver",
            TargetAction::Station => "station",
        }
    }
}

impl fmt::Display for TargetAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetAction {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "pickup" | "pick_up" | "picking_up" => Ok(TargetAction::Pickup),
            "deliver" | "delivery" | "delivering" => Ok(TargetAction::Deliver),
            "station" | "return" => Ok(TargetAction::Station),
            other => Err(format!("Unknown target action: {other}")),
        }
    }
}

impl<'de> Deserialize<'de> for TargetAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotTarget {
    pub node_id: NodeId,
    pub action: TargetAction,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

/// One bot as reported by the latest poll.
///
/// Both the position feed and the roster decode into this shape; the roster
/// reports `current_order_count` and carries no route or target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bot {
    pub id: BotId,
    pub name: String,
    pub status: BotStatus,
    #[serde(default)]
    pub current_node_id: Option<NodeId>,
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
    #[serde(default)]
    pub route: Vec<NodeId>,
    #[serde(default)]
    pub target: Option<BotTarget>,
    #[serde(default, alias = "current_order_count")]
    pub active_orders: u32,
}

impl Bot {
    pub fn is_active(&self) -> bool {
        !self.status.is_idle()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Assigned,
    PickedUp,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Assigned => "ASSIGNED",
            OrderStatus::PickedUp => "PICKED_UP",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Still moving through the pipeline: neither delivered nor cancelled.
    pub fn is_active(&self) -> bool {
        !matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn expects_bot(&self) -> bool {
        !matches!(self, OrderStatus::Pending | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub restaurant_id: RestaurantId,
    #[serde(default)]
    pub restaurant_name: Option<String>,
    pub pickup_node_id: NodeId,
    #[serde(default)]
    pub pickup_address: String,
    pub delivery_node_id: NodeId,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub bot_id: Option<BotId>,
    #[serde(default)]
    pub bot_name: Option<String>,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picked_up_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<String>,
}

impl Order {
    pub fn restaurant_label(&self) -> &str {
        self.restaurant_name.as_deref().unwrap_or("(unknown)")
    }

    /// `bot_id` is expected to be set exactly when the order has left
    /// PENDING and was not cancelled.
    pub fn assignment_consistent(&self) -> bool {
        self.bot_id.is_some() == self.status.expects_bot()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationStatus {
    pub is_running: bool,
    pub tick_count: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub delivered_orders: i64,
    pub active_bots: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: NodeId, x: i32, y: i32) -> Node {
        Node {
            id,
            x,
            y,
            is_delivery_point: false,
            address: format!("LR{x}{y}"),
        }
    }

    #[test]
    fn target_action_accepts_both_casings() {
        let lower: BotTarget =
            serde_json::from_str(r#"{"node_id": 4, "action": "pickup", "order_id": 9}"#).unwrap();
        let upper: BotTarget =
            serde_json::from_str(r#"{"node_id": 4, "action": "DELIVER", "order_id": null}"#)
                .unwrap();
        let station: BotTarget =
            serde_json::from_str(r#"{"node_id": 1, "action": "STATION"}"#).unwrap();

        assert_eq!(lower.action, TargetAction::Pickup);
        assert_eq!(lower.order_id, Some(9));
        assert_eq!(upper.action, TargetAction::Deliver);
        assert_eq!(upper.order_id, None);
        assert_eq!(station.action, TargetAction::Station);
        assert_eq!(
            serde_json::to_value(TargetAction::Deliver).unwrap(),
            serde_json::json!("deliver")
        );
    }

    #[test]
    fn roster_bot_decodes_with_order_count_alias() {
        let bot: Bot = serde_json::from_str(
            r#"{"id": 2, "name": "Bot-2", "status": "PICKING_UP", "current_node_id": 7,
                "x": 3, "y": 1, "max_capacity": 3, "current_order_count": 2,
                "available_capacity": 1}"#,
        )
        .unwrap();

        assert_eq!(bot.status, BotStatus::PickingUp);
        assert_eq!(bot.active_orders, 2);
        assert!(bot.route.is_empty());
        assert!(bot.target.is_none());
        assert!(bot.is_active());
    }

    #[test]
    fn bot_without_node_still_decodes() {
        let bot: Bot = serde_json::from_str(
            r#"{"id": 5, "name": "Bot-5", "status": "IDLE", "current_node_id": null,
                "x": null, "y": null, "route": [], "target": null, "active_orders": 0}"#,
        )
        .unwrap();

        assert_eq!(bot.current_node_id, None);
        assert!(!bot.is_active());
    }

    #[test]
    fn bounds_cover_sparse_lattice() {
        let topology = GridTopology {
            nodes: vec![node(1, 2, -1), node(2, 5, 3), node(3, -1, 0)],
            ..GridTopology::default()
        };

        let bounds = topology.bounds().unwrap();
        assert_eq!(bounds.min_x, -1);
        assert_eq!(bounds.max_x, 5);
        assert_eq!(bounds.columns(), 7);
        assert_eq!(bounds.rows(), 5);
        assert!(bounds.contains(0, 0));
        assert!(!bounds.contains(6, 0));
        assert!(GridTopology::default().bounds().is_none());
    }

    #[test]
    fn validate_reports_dangling_references() {
        let topology = GridTopology {
            nodes: vec![node(1, 0, 0), node(2, 0, 0)],
            restaurants: vec![Restaurant {
                id: 1,
                name: "PIZZA".to_string(),
                node_id: 99,
                x: 0,
                y: 0,
                address: String::new(),
            }],
            blocked_edges: Vec::new(),
            delivery_points: vec![node(42, 1, 1)],
        };

        let issues = topology.validate();
        assert_eq!(issues.len(), 3);
        assert!(matches!(
            issues[0],
            TopologyIssue::DuplicateCoordinate { first: 1, second: 2, .. }
        ));
        assert!(issues[1].to_string().contains("missing node 99"));
        assert_eq!(
            issues[2],
            TopologyIssue::DanglingDeliveryPoint { node_id: 42 }
        );
    }

    #[test]
    fn order_assignment_contract() {
        let mut order: Order = serde_json::from_str(
            r#"{"id": 1, "restaurant_id": 2, "restaurant_name": null, "pickup_node_id": 5,
                "delivery_node_id": 12, "status": "PENDING"}"#,
        )
        .unwrap();
        assert_eq!(order.restaurant_label(), "(unknown)");
        assert!(order.assignment_consistent());

        order.status = OrderStatus::Assigned;
        assert!(!order.assignment_consistent());
        order.bot_id = Some(3);
        assert!(order.assignment_consistent());
    }
}
