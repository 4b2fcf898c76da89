use crate::state::{DEFAULT_LOG_CAPACITY, DEFAULT_TOAST_TTL};
use clap::Parser;
use fleet_client::{BotFeed, DEFAULT_BASE_URL};
use std::path::PathBuf;
use std::time::Duration;

const MIN_INTERVAL_MS: u64 = 100;

#[derive(Parser, Debug)]
#[command(name = "fleet-monitor", about = "Live terminal view of the delivery-bot simulation")]
struct Args {
    /// Base address of the simulation API.
    #[arg(long, env = "FLEET_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,
    /// Snapshot polling cadence.
    #[arg(long, env = "FLEET_POLL_MS", default_value_t = 1000)]
    poll_ms: u64,
    /// Auto-advance cadence while enabled.
    #[arg(long, env = "FLEET_AUTO_TICK_MS", default_value_t = 1000)]
    auto_tick_ms: u64,
    #[arg(long, env = "FLEET_TOAST_SECS", default_value_t = DEFAULT_TOAST_TTL.as_secs())]
    toast_secs: u64,
    #[arg(long, default_value_t = DEFAULT_LOG_CAPACITY)]
    log_capacity: usize,
    /// `positions` (routes and targets) or `roster` (order counts).
    #[arg(long, default_value = "positions", value_parser = parse_bot_feed)]
    bot_feed: BotFeed,
    #[arg(long, env = "FLEET_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub poll_interval: Duration,
    pub auto_tick_interval: Duration,
    pub toast_ttl: Duration,
    pub log_capacity: usize,
    pub bot_feed: BotFeed,
    pub log_file: Option<PathBuf>,
    pub log_stdout: bool,
}

pub fn load_config() -> Config {
    Config::from_args(Args::parse())
}

impl Config {
    fn from_args(args: Args) -> Self {
        Self {
            api_url: args.api_url.trim().to_string(),
            poll_interval: Duration::from_millis(args.poll_ms.max(MIN_INTERVAL_MS)),
            auto_tick_interval: Duration::from_millis(args.auto_tick_ms.max(MIN_INTERVAL_MS)),
            toast_ttl: Duration::from_secs(args.toast_secs.max(1)),
            log_capacity: args.log_capacity.max(1),
            bot_feed: args.bot_feed,
            log_file: args.log_file,
            log_stdout: env_flag("FLEET_LOG_STDOUT"),
        }
    }
}

fn parse_bot_feed(value: &str) -> Result<BotFeed, String> {
    value.parse()
}

pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|value| parse_bool_flag(&value))
        .unwrap_or(false)
}
