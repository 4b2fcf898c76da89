//! Access to the simulation process: the [`SimulationSource`] seam and its
//! HTTP implementation.

pub mod error;
pub mod http;
pub mod source;

pub use error::ClientError;
pub use http::{BotFeed, HttpSource, DEFAULT_BASE_URL};
pub use source::{ControlAck, SimulationSource};
