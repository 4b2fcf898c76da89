use crate::error::{extract_detail, ClientError};
use crate::source::{ControlAck, SimulationSource};
use fleet_core::{Bot, GridTopology, NodeId, Order, RestaurantId, SimulationStatus};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Which endpoint feeds the bot slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BotFeed {
    /// `simulation/bots/positions`: routes and targets included.
    #[default]
    Positions,
    /// `bots`: roster with order counts, no routes.
    Roster,
}

impl BotFeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotFeed::Positions => "positions",
            BotFeed::Roster => "roster",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            BotFeed::Positions => "simulation/bots/positions",
            BotFeed::Roster => "bots",
        }
    }
}

impl fmt::Display for BotFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BotFeed {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "positions" | "position" => Ok(BotFeed::Positions),
            "roster" | "bots" => Ok(BotFeed::Roster),
            other => Err(format!("Unknown bot feed: {other}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PositionsEnvelope {
    bots: Vec<Bot>,
    #[serde(default)]
    tick: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody {
    restaurant_id: RestaurantId,
    delivery_node_id: NodeId,
}

/// [`SimulationSource`] over the simulation's JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base: Url,
    bot_feed: BotFeed,
}

impl HttpSource {
    pub fn new(base_url: &str, bot_feed: BotFeed) -> Result<Self, ClientError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base = Url::parse(&normalized).map_err(|err| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                url: base_url.to_string(),
                reason: "not a hierarchical url".to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|err| ClientError::Transport {
                endpoint: base.to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            base,
            bot_feed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn bot_feed(&self) -> BotFeed {
        self.bot_feed
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base.join(path).map_err(|err| ClientError::InvalidUrl {
            url: format!("{}{path}", self.base),
            reason: err.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        debug!(event = "source_request", method = "GET", endpoint = path);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| transport_error(path, &err))?;
        read_json(path, response).await
    }

    async fn post<T, B>(&self, path: &str, body: Option<&B>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        debug!(event = "source_request", method = "POST", endpoint = path);
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| transport_error(path, &err))?;
        read_json(path, response).await
    }

    async fn control(&self, path: &str) -> Result<ControlAck, ClientError> {
        self.post::<ControlAck, ()>(path, None).await
    }
}

fn transport_error(endpoint: &str, err: &reqwest::Error) -> ClientError {
    ClientError::Transport {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    }
}

async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| transport_error(endpoint, &err))?;
    if !status.is_success() {
        return Err(ClientError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            detail: extract_detail(&body),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|err| ClientError::Decode {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    })
}

impl SimulationSource for HttpSource {
    async fn fetch_topology(&self) -> Result<GridTopology, ClientError> {
        self.get("grid").await
    }

    async fn fetch_bots(&self) -> Result<Vec<Bot>, ClientError> {
        match self.bot_feed {
            BotFeed::Positions => {
                let envelope: PositionsEnvelope = self.get(self.bot_feed.path()).await?;
                debug!(
                    event = "positions_received",
                    bots = envelope.bots.len(),
                    tick = ?envelope.tick
                );
                Ok(envelope.bots)
            }
            BotFeed::Roster => self.get(self.bot_feed.path()).await,
        }
    }

    async fn fetch_orders(&self) -> Result<Vec<Order>, ClientError> {
        self.get("orders").await
    }

    async fn fetch_status(&self) -> Result<SimulationStatus, ClientError> {
        self.get("simulation/status").await
    }

    async fn create_order(
        &self,
        restaurant_id: RestaurantId,
        delivery_point_id: NodeId,
    ) -> Result<Order, ClientError> {
        let body = CreateOrderBody {
            restaurant_id,
            delivery_node_id: delivery_point_id,
        };
        self.post("orders", Some(&body)).await
    }

    async fn start(&self) -> Result<ControlAck, ClientError> {
        self.control("simulation/start").await
    }

    async fn stop(&self) -> Result<ControlAck, ClientError> {
        self.control("simulation/stop").await
    }

    async fn tick(&self) -> Result<ControlAck, ClientError> {
        self.control("simulation/tick").await
    }

    async fn reset(&self) -> Result<ControlAck, ClientError> {
        self.control("simulation/reset").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_keep_base_path() {
        let source = HttpSource::new("http://localhost:8000/api", BotFeed::Positions).unwrap();
        assert_eq!(
            source.endpoint("simulation/status").unwrap().as_str(),
            "http://localhost:8000/api/simulation/status"
        );
        let trailing = HttpSource::new("http://sim.local/api/", BotFeed::Roster).unwrap();
        assert_eq!(
            trailing.endpoint("grid").unwrap().as_str(),
            "http://sim.local/api/grid"
        );
    }

    #[test]
    fn rejects_unusable_base() {
        assert!(matches!(
            HttpSource::new("not a url", BotFeed::Positions),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(matches!(
            HttpSource::new("mailto:ops@example.com", BotFeed::Positions),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn bot_feed_parses_aliases() {
        assert_eq!("Positions".parse::<BotFeed>(), Ok(BotFeed::Positions));
        assert_eq!("bots".parse::<BotFeed>(), Ok(BotFeed::Roster));
        assert!("radar".parse::<BotFeed>().is_err());
    }
}
