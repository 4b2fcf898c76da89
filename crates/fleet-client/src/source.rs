use crate::error::ClientError;
use fleet_core::{Bot, GridTopology, NodeId, Order, RestaurantId, SimulationStatus};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Acknowledgement of a control call. Callers observe the effect through
/// the next poll, so nothing here is load-bearing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tick: Option<i64>,
    #[serde(default)]
    pub is_running: Option<bool>,
}

/// The authoritative simulation process, as seen by the view.
///
/// Reads are idempotent and safe to call on a fixed cadence. Control calls
/// mutate the source and return no entity snapshots.
pub trait SimulationSource: Send + Sync + 'static {
    fn fetch_topology(&self) -> impl Future<Output = Result<GridTopology, ClientError>> + Send;

    fn fetch_bots(&self) -> impl Future<Output = Result<Vec<Bot>, ClientError>> + Send;

    fn fetch_orders(&self) -> impl Future<Output = Result<Vec<Order>, ClientError>> + Send;

    fn fetch_status(&self) -> impl Future<Output = Result<SimulationStatus, ClientError>> + Send;

    fn create_order(
        &self,
        restaurant_id: RestaurantId,
        delivery_point_id: NodeId,
    ) -> impl Future<Output = Result<Order, ClientError>> + Send;

    fn start(&self) -> impl Future<Output = Result<ControlAck, ClientError>> + Send;

    fn stop(&self) -> impl Future<Output = Result<ControlAck, ClientError>> + Send;

    fn tick(&self) -> impl Future<Output = Result<ControlAck, ClientError>> + Send;

    fn reset(&self) -> impl Future<Output = Result<ControlAck, ClientError>> + Send;
}
