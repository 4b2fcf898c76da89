use axum::extract::Json;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use fleet_client::{BotFeed, ClientError, HttpSource, SimulationSource};
use fleet_core::{BotStatus, OrderStatus, TargetAction};
use serde_json::{json, Value};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api")
}

fn grid_body() -> Value {
    json!({
        "nodes": [
            {"id": 1, "x": 0, "y": 0, "is_delivery_point": false, "address": "LR00"},
            {"id": 2, "x": 1, "y": 0, "is_delivery_point": true, "address": "LR10"},
            {"id": 3, "x": 0, "y": 1, "is_delivery_point": false, "address": "LR01"},
            {"id": 4, "x": 1, "y": 1, "is_delivery_point": false, "address": "LR11"}
        ],
        "restaurants": [
            {"id": 1, "name": "PIZZA", "node_id": 3, "x": 0, "y": 1, "address": "LR01"}
        ],
        "blocked_edges": [],
        "delivery_points": [
            {"id": 2, "x": 1, "y": 0, "is_delivery_point": true, "address": "LR10"}
        ]
    })
}

fn order_body(id: i64, delivery_node_id: i64) -> Value {
    json!({
        "id": id,
        "restaurant_id": 1,
        "restaurant_name": "PIZZA",
        "pickup_node_id": 3,
        "pickup_address": "LR01",
        "delivery_node_id": delivery_node_id,
        "delivery_address": "LR10",
        "status": "PENDING",
        "bot_id": null,
        "bot_name": null,
        "created_at": "2026-10-19T09:30:00"
    })
}

async fn create_order(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    match body.get("delivery_node_id").and_then(Value::as_i64) {
        Some(2) => (StatusCode::CREATED, Json(order_body(7, 2))),
        Some(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Selected node is not a valid delivery point"})),
        ),
        None => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [
                {"loc": ["body", "delivery_node_id"], "msg": "field required", "type": "missing"}
            ]})),
        ),
    }
}

fn simulation_router() -> Router {
    Router::new()
        .route("/api/grid", get(|| async { Json(grid_body()) }))
        .route(
            "/api/simulation/bots/positions",
            get(|| async {
                Json(json!({
                    "tick": 41,
                    "bots": [{
                        "id": 1,
                        "name": "Bot-1",
                        "status": "MOVING",
                        "current_node_id": 1,
                        "x": 0,
                        "y": 0,
                        "route": [1, 3],
                        "target": {"node_id": 3, "action": "PICKUP", "order_id": 7}
                    }]
                }))
            }),
        )
        .route(
            "/api/bots",
            get(|| async {
                Json(json!([
                    {"id": 1, "name": "Bot-1", "status": "IDLE", "current_node_id": 1,
                     "x": 0, "y": 0, "current_order_count": 2},
                    {"id": 2, "name": "Bot-2", "status": "DELIVERING", "current_node_id": null,
                     "x": null, "y": null, "current_order_count": 0}
                ]))
            }),
        )
        .route(
            "/api/orders",
            get(|| async { Json(json!([order_body(1, 2), order_body(2, 2)])) }).post(create_order),
        )
        .route(
            "/api/simulation/status",
            get(|| async {
                Json(json!({
                    "is_running": true,
                    "tick_count": 41,
                    "total_orders": 2,
                    "pending_orders": 2,
                    "delivered_orders": 0,
                    "active_bots": 1
                }))
            }),
        )
        .route(
            "/api/simulation/start",
            post(|| async { Json(json!({"message": "Simulation started", "is_running": true})) }),
        )
        .route(
            "/api/simulation/tick",
            post(|| async { Json(json!({"message": "Tick processed", "tick": 42})) }),
        )
        .route(
            "/api/simulation/stop",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance window") }),
        )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reads_are_idempotent_snapshots() {
    let base = serve(simulation_router()).await;
    let source = HttpSource::new(&base, BotFeed::Positions).unwrap();

    let topology = source.fetch_topology().await.unwrap();
    assert_eq!(topology.nodes.len(), 4);
    assert!(topology.is_delivery_point(2));
    assert_eq!(topology.restaurants[0].name, "PIZZA");

    let first = source.fetch_orders().await.unwrap();
    let second = source.fetch_orders().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].status, OrderStatus::Pending);
    assert_eq!(first[0].restaurant_label(), "PIZZA");

    let status = source.fetch_status().await.unwrap();
    assert!(status.is_running);
    assert_eq!(status.tick_count, 41);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn positions_feed_unwraps_envelope() {
    let base = serve(simulation_router()).await;
    let source = HttpSource::new(&base, BotFeed::Positions).unwrap();

    let bots = source.fetch_bots().await.unwrap();
    assert_eq!(bots.len(), 1);
    let target = bots[0].target.as_ref().expect("target decoded");
    assert_eq!(target.action, TargetAction::Pickup);
    assert_eq!(target.order_id, Some(7));
    assert_eq!(bots[0].route, vec![1, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn roster_feed_reads_order_counts() {
    let base = serve(simulation_router()).await;
    let source = HttpSource::new(&base, BotFeed::Roster).unwrap();

    let bots = source.fetch_bots().await.unwrap();
    assert_eq!(bots.len(), 2);
    assert_eq!(bots[0].active_orders, 2);
    assert_eq!(bots[1].status, BotStatus::Delivering);
    assert_eq!(bots[1].current_node_id, None);
    assert!(bots[1].route.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_order_surfaces_detail() {
    let base = serve(simulation_router()).await;
    let source = HttpSource::new(&base, BotFeed::Positions).unwrap();

    let created = source.create_order(1, 2).await.unwrap();
    assert_eq!(created.id, 7);
    assert_eq!(created.delivery_node_id, 2);

    let err = source.create_order(1, 4).await.unwrap_err();
    match &err {
        ClientError::Status { status, detail, .. } => {
            assert_eq!(*status, 400);
            assert_eq!(
                detail.as_deref(),
                Some("Selected node is not a valid delivery point")
            );
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert_eq!(err.user_message(), "Selected node is not a valid delivery point");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn control_calls_acknowledge_or_fail() {
    let base = serve(simulation_router()).await;
    let source = HttpSource::new(&format!("{base}/"), BotFeed::Positions).unwrap();

    let started = source.start().await.unwrap();
    assert_eq!(started.is_running, Some(true));
    let ticked = source.tick().await.unwrap();
    assert_eq!(ticked.tick, Some(42));

    let err = source.stop().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Status { status: 503, detail: None, .. }
    ));
    assert_eq!(err.user_message(), "request failed (503)");

    // Route not registered: the 404 still maps to a status error.
    let err = source.reset().await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 404, .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_source_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = HttpSource::new(&format!("http://{addr}/api"), BotFeed::Positions).unwrap();
    let err = source.fetch_topology().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(err.user_message(), "simulation server unreachable");
}
