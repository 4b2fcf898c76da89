//! Domain model and pure view computations for the fleet monitor: grid
//! occupancy, responsive cell sizing and order/bot projections.

pub mod layout;
pub mod model;
pub mod occupancy;
pub mod projection;

pub use model::{
    BlockedEdge, Bot, BotId, BotStatus, BotTarget, GridBounds, GridTopology, Node, NodeId, Order,
    OrderId, OrderStatus, Restaurant, RestaurantId, SimulationStatus, TargetAction, TopologyIssue,
};
